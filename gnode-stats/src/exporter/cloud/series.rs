/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use chrono::{DateTime, Utc};

use gnode_types::metrics::MetricTagMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    /// The value accumulates since the start of the interval.
    Cumulative,
}

/// One exported point, bound to a metric type and a monitored resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeSeries {
    pub metric_type: String,
    pub metric_kind: MetricKind,
    pub metric_labels: MetricTagMap,
    pub resource_type: String,
    pub resource_labels: MetricTagMap,
    pub value: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
