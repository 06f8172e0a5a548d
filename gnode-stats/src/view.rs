/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use gnode_types::metrics::{MetricTagMap, MetricTagName, MetricsName, ParseError};

use crate::measure::Measure;
use crate::tag::{TagError, TagKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("invalid view name {0}: {1}")]
    InvalidName(String, ParseError),
    #[error(transparent)]
    InvalidTagKey(#[from] TagError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum of all recorded values.
    Sum,
    /// Number of recorded values, the values themselves are ignored.
    Count,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
        }
    }
}

/// Binds a measure to an aggregation, grouped by a set of tag keys.
#[derive(Debug)]
pub struct View {
    name: MetricsName,
    description: String,
    measure: Arc<Measure>,
    aggregation: Aggregation,
    tag_keys: Vec<MetricTagName>,
}

impl View {
    pub fn new(
        name: &str,
        description: &str,
        measure: Arc<Measure>,
        aggregation: Aggregation,
        tag_keys: &[TagKey],
    ) -> Result<Self, ViewError> {
        let name = MetricsName::from_str(name)
            .map_err(|e| ViewError::InvalidName(name.to_string(), e))?;
        let tag_keys = tag_keys
            .iter()
            .map(|k| k.to_tag_name())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(View {
            name,
            description: description.to_string(),
            measure,
            aggregation,
            tag_keys,
        })
    }

    #[inline]
    pub fn name(&self) -> &MetricsName {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn measure(&self) -> &Arc<Measure> {
        &self.measure
    }

    #[inline]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    #[inline]
    pub fn tag_keys(&self) -> &[MetricTagName] {
        &self.tag_keys
    }
}

/// Aggregated value of one row of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregationData {
    Sum(i64),
    Count(u64),
}

impl AggregationData {
    pub(crate) fn new(aggregation: Aggregation) -> Self {
        match aggregation {
            Aggregation::Sum => AggregationData::Sum(0),
            Aggregation::Count => AggregationData::Count(0),
        }
    }

    pub(crate) fn add_sample(&mut self, value: i64) {
        match self {
            AggregationData::Sum(sum) => *sum = sum.saturating_add(value),
            AggregationData::Count(count) => *count = count.saturating_add(1),
        }
    }

    /// The value as reported to int64 time series.
    pub fn as_i64(&self) -> i64 {
        match self {
            AggregationData::Sum(sum) => *sum,
            AggregationData::Count(count) => i64::try_from(*count).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for AggregationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationData::Sum(sum) => itoa::Buffer::new().format(*sum).fmt(f),
            AggregationData::Count(count) => itoa::Buffer::new().format(*count).fmt(f),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewRow {
    pub tags: MetricTagMap,
    pub data: AggregationData,
}

/// Snapshot of a view, cumulative since `start`.
#[derive(Clone, Debug)]
pub struct ViewData {
    pub view: Arc<View>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rows: Vec<ViewRow>,
}

impl ViewData {
    pub fn find_row(&self, tags: &MetricTagMap) -> Option<&ViewRow> {
        self.rows.iter().find(|r| &r.tags == tags)
    }
}
