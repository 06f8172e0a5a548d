/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod resource;
pub use resource::{
    GENERIC_NODE_RESOURCE_TYPE, GenericNodeResource, LABEL_LOCATION, LABEL_NAMESPACE,
    LABEL_NODE_ID, MonitoredResource,
};

mod measure;
pub use measure::{CACHE_STATUS, DATABASE_STATUS, LOG_SIZE, Measure, MeasureUnit, Measurement};

mod tag;
pub use tag::{TagContext, TagError, TagKey};

mod view;
pub use view::{Aggregation, AggregationData, View, ViewData, ViewError, ViewRow};

mod worker;
pub use worker::{DEFAULT_REPORTING_PERIOD, RegisterError, ViewWorker};

mod exporter;
pub use exporter::cloud::{
    CloudMonitoringExporter, DefaultLabels, ExporterOptions, LabelValue, METRIC_TYPE_DOMAIN,
    MetricKind, MetricTypeFn, TASK_LABEL_KEY, TimeSeries, get_metric_type, init_exporter,
};
pub use exporter::{ArcViewExporter, ViewExporter};

mod config;
pub use config::{DEFAULT_CACHE_SIZE, ExportBackend, StatsConfig};

mod registry;
pub use registry::{
    DEFAULT_REPORTING_INTERVAL, MIN_REPORTING_INTERVAL, MetricsRegistry, SOURCE_KEY,
};
