/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::anyhow;

use gnode_types::metrics::{MetricTagMap, MetricTagName, MetricTagValue};

/// Key of the label added when no default labels are given.
pub const TASK_LABEL_KEY: &str = "task";
const TASK_LABEL_DESCRIPTION: &str = "Task identifier";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelValue {
    pub value: String,
    pub description: String,
}

/// Labels added to every exported time series.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultLabels {
    labels: BTreeMap<String, LabelValue>,
}

impl DefaultLabels {
    pub fn new() -> Self {
        DefaultLabels::default()
    }

    pub fn set(&mut self, key: &str, value: &str, description: &str) {
        self.labels.insert(
            key.to_string(),
            LabelValue {
                value: value.to_string(),
                description: description.to_string(),
            },
        );
    }

    pub fn with_label(mut self, key: &str, value: &str, description: &str) -> Self {
        self.set(key, value, description);
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, key: &str) -> Option<&LabelValue> {
        self.labels.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LabelValue)> {
        self.labels.iter()
    }

    pub(super) fn to_tag_map(&self) -> anyhow::Result<MetricTagMap> {
        let mut tags = MetricTagMap::default();
        for (k, v) in &self.labels {
            let name = MetricTagName::from_str(k)
                .map_err(|e| anyhow!("invalid default label key {k}: {e}"))?;
            let value = MetricTagValue::from_str(&v.value)
                .map_err(|e| anyhow!("invalid value for default label {k}: {e}"))?;
            tags.insert(name, value);
        }
        Ok(tags)
    }

    /// The single `task` label identifying this process.
    pub fn task() -> Self {
        DefaultLabels::new().with_label(TASK_LABEL_KEY, &task_value(), TASK_LABEL_DESCRIPTION)
    }
}

impl From<&MetricTagMap> for DefaultLabels {
    fn from(tags: &MetricTagMap) -> Self {
        let mut labels = DefaultLabels::new();
        for (k, v) in tags.iter() {
            labels.set(k.as_str(), v.as_str(), "");
        }
        labels
    }
}

fn task_value() -> String {
    let task = format!("rust-{}-{}", std::process::id(), hostname());
    if MetricTagValue::from_str(&task).is_ok() {
        task
    } else {
        format!("rust-{}", std::process::id())
    }
}

#[cfg(unix)]
fn hostname() -> String {
    rustix::system::uname()
        .nodename()
        .to_string_lossy()
        .into_owned()
}

#[cfg(not(unix))]
fn hostname() -> String {
    "localhost".to_string()
}
