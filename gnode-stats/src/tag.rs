/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use gnode_types::metrics::{MetricTagMap, MetricTagName, MetricTagValue, ParseError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("invalid tag key {key}: {source}")]
    InvalidKey { key: String, source: ParseError },
    #[error("invalid value for tag key {key}: {source}")]
    InvalidValue { key: String, source: ParseError },
}

/// Key of a tag, checked again every time it is attached to a context.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagKey {
    name: String,
}

impl TagKey {
    pub fn new(name: &str) -> Result<Self, TagError> {
        let key = TagKey {
            name: name.to_string(),
        };
        key.to_tag_name()?;
        Ok(key)
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked(name: &str) -> Self {
        TagKey {
            name: name.to_string(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn to_tag_name(&self) -> Result<MetricTagName, TagError> {
        MetricTagName::from_str(&self.name).map_err(|source| TagError::InvalidKey {
            key: self.name.clone(),
            source,
        })
    }
}

/// An immutable set of tags carried along with recorded measurements.
///
/// Mutating operations return a derived context and leave `self` untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagContext {
    tags: Arc<MetricTagMap>,
}

impl TagContext {
    /// The empty context.
    pub fn background() -> Self {
        TagContext::default()
    }

    /// Derive a new context with `key` set to `value`, replacing any old value.
    pub fn upsert(&self, key: &TagKey, value: &str) -> Result<TagContext, TagError> {
        let name = key.to_tag_name()?;
        let value = MetricTagValue::from_str(value).map_err(|source| TagError::InvalidValue {
            key: key.name.clone(),
            source,
        })?;

        let mut tags = self.tags.as_ref().clone();
        tags.insert(name, value);
        Ok(TagContext {
            tags: Arc::new(tags),
        })
    }

    pub fn get(&self, key: &TagKey) -> Option<&str> {
        let name = key.to_tag_name().ok()?;
        self.tags.get(&name).map(|v| v.as_str())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[inline]
    pub fn tags(&self) -> &MetricTagMap {
        &self.tags
    }
}
