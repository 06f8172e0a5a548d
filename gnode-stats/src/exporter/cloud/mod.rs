/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use log::warn;

use gnode_types::metrics::{MetricTagMap, MetricTagName, MetricTagValue, MetricsName};

use super::formatter::{self, TagGroup};
use super::{MetricsSink, ViewExporter};
use crate::config::{DEFAULT_CACHE_SIZE, ExportBackend};
use crate::resource::{GenericNodeResource, MonitoredResource};
use crate::view::{View, ViewData};

mod labels;
pub use labels::{DefaultLabels, LabelValue, TASK_LABEL_KEY};

mod series;
pub use series::{MetricKind, TimeSeries};

pub const METRIC_TYPE_DOMAIN: &str = "custom.googleapis.com";

const TAG_PROJECT_ID: &str = "project_id";
const TAG_RESOURCE_TYPE: &str = "resource_type";

pub type MetricTypeFn = fn(&View) -> String;

/// The backend metric type of a view: `custom.googleapis.com/<view-name>`.
pub fn get_metric_type(view: &View) -> String {
    format!("{METRIC_TYPE_DOMAIN}/{}", view.name())
}

pub struct ExporterOptions {
    pub project_id: String,
    pub monitored_resource: Arc<dyn MonitoredResource>,
    /// Use the `task` label if not set.
    pub default_labels: Option<DefaultLabels>,
    pub get_metric_type: MetricTypeFn,
    pub backend: ExportBackend,
    pub cache_size: usize,
}

impl ExporterOptions {
    pub fn new(project_id: &str, monitored_resource: Arc<dyn MonitoredResource>) -> Self {
        ExporterOptions {
            project_id: project_id.to_string(),
            monitored_resource,
            default_labels: None,
            get_metric_type,
            backend: ExportBackend::default(),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Index of the 64s slice `elapsed` falls in.
fn error_report_slice(elapsed: Duration) -> u64 {
    elapsed.as_secs() >> 6
}

struct SinkState {
    sink: MetricsSink,
    create_instant: Instant,
    last_error_report: Option<u64>,
}

impl SinkState {
    fn new(sink: MetricsSink) -> Self {
        SinkState {
            sink,
            create_instant: Instant::now(),
            last_error_report: None,
        }
    }

    /// Returns true if the error should be logged, at most once per slice.
    fn check_error_report(&mut self, elapsed: Duration) -> bool {
        let time_slice = error_report_slice(elapsed);
        if self.last_error_report == Some(time_slice) {
            false
        } else {
            self.last_error_report = Some(time_slice);
            true
        }
    }

    fn handle_emit_error(&mut self, e: io::Error) {
        if self.check_error_report(self.create_instant.elapsed()) {
            warn!("sending metrics error: {e:?}");
        }
    }
}

/// Exports cumulative view data as time series of a monitored resource.
pub struct CloudMonitoringExporter {
    project_id: String,
    resource_type: String,
    resource_labels: MetricTagMap,
    default_labels: MetricTagMap,
    get_metric_type: MetricTypeFn,
    common_tags: TagGroup,
    /// Tag names already taken by the common tags.
    reserved_tags: Vec<MetricTagName>,
    sink: Mutex<SinkState>,
}

impl CloudMonitoringExporter {
    pub fn new(options: ExporterOptions) -> anyhow::Result<Self> {
        let sink = options
            .backend
            .build_sink(options.cache_size)
            .context("failed to setup metrics sink")?;
        CloudMonitoringExporter::with_sink(options, sink)
    }

    pub(crate) fn with_sink(options: ExporterOptions, sink: MetricsSink) -> anyhow::Result<Self> {
        if options.project_id.is_empty() {
            return Err(anyhow!("no project id has been set"));
        }
        MetricTagValue::from_str(&options.project_id)
            .map_err(|e| anyhow!("invalid project id {}: {e}", options.project_id))?;

        let (resource_type, labels) = options.monitored_resource.monitored_resource();
        let resource_type = resource_type.to_string();
        MetricTagValue::from_str(&resource_type)
            .map_err(|e| anyhow!("invalid monitored resource type {resource_type}: {e}"))?;
        let mut resource_labels = MetricTagMap::default();
        for (k, v) in labels {
            let name = MetricTagName::from_str(&k)
                .map_err(|e| anyhow!("invalid resource label key {k}: {e}"))?;
            let value = MetricTagValue::from_str(&v)
                .map_err(|e| anyhow!("invalid value for resource label {k}: {e}"))?;
            resource_labels.insert(name, value);
        }

        let mut reserved_tags = Vec::with_capacity(resource_labels.len() + 2);
        for name in [TAG_PROJECT_ID, TAG_RESOURCE_TYPE] {
            let name = MetricTagName::from_str(name)
                .map_err(|e| anyhow!("invalid tag name {name}: {e}"))?;
            reserved_tags.push(name);
        }
        reserved_tags.extend(resource_labels.iter().map(|(k, _)| k.clone()));

        let default_labels = match &options.default_labels {
            Some(labels) => labels.to_tag_map()?,
            None => DefaultLabels::task().to_tag_map()?,
        };
        if let Some(name) = reserved_tags.iter().find(|k| default_labels.contains(k)) {
            return Err(anyhow!(
                "default label {name} conflicts with a resource or project tag"
            ));
        }

        let mut common_tags = TagGroup::default();
        common_tags.add_tag(TAG_PROJECT_ID, &options.project_id);
        common_tags.add_tag(TAG_RESOURCE_TYPE, &resource_type);
        common_tags.add_tag_map(&resource_labels);

        Ok(CloudMonitoringExporter {
            project_id: options.project_id,
            resource_type,
            resource_labels,
            default_labels,
            get_metric_type: options.get_metric_type,
            common_tags,
            reserved_tags,
            sink: Mutex::new(SinkState::new(sink)),
        })
    }

    #[inline]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[inline]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    #[inline]
    pub fn resource_labels(&self) -> &MetricTagMap {
        &self.resource_labels
    }

    #[inline]
    pub fn default_labels(&self) -> &MetricTagMap {
        &self.default_labels
    }

    pub fn metric_type(&self, view: &View) -> String {
        (self.get_metric_type)(view)
    }

    /// Convert every row of the view data into a time series.
    ///
    /// Row tags named like a resource or project tag are dropped.
    pub fn time_series(&self, data: &ViewData) -> Vec<TimeSeries> {
        let metric_type = self.metric_type(&data.view);
        data.rows
            .iter()
            .map(|row| {
                let mut metric_labels = self.default_labels.clone();
                metric_labels.extend(row.tags.clone());
                for name in &self.reserved_tags {
                    metric_labels.drop(name);
                }
                TimeSeries {
                    metric_type: metric_type.clone(),
                    metric_kind: MetricKind::Cumulative,
                    metric_labels,
                    resource_type: self.resource_type.clone(),
                    resource_labels: self.resource_labels.clone(),
                    value: row.data.as_i64(),
                    start: data.start,
                    end: data.end,
                }
            })
            .collect()
    }
}

impl ViewExporter for CloudMonitoringExporter {
    fn export_view(&self, data: &ViewData) {
        let series = self.time_series(data);
        let Some(first) = series.first() else {
            return;
        };
        if let Err(e) = MetricsName::from_str(&first.metric_type) {
            warn!(
                "skip view {}: invalid metric type {}: {e}",
                data.view.name(),
                first.metric_type
            );
            return;
        }

        let mut state = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let mut line = Vec::with_capacity(256);
        for ts in &series {
            line.clear();
            formatter::format_gauge(
                &mut line,
                &ts.metric_type,
                ts.value,
                &self.common_tags,
                &ts.metric_labels,
            );
            if let Err(e) = state.sink.emit(&line) {
                state.handle_emit_error(e);
            }
        }
    }

    fn flush(&self) {
        let mut state = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = state.sink.flush() {
            state.handle_emit_error(e);
        }
    }
}

/// Build an exporter for a `generic_node` resource, sending to the default backend.
pub fn init_exporter(
    project: &str,
    location: &str,
    namespace: &str,
    node: &str,
    labels: Option<DefaultLabels>,
) -> anyhow::Result<CloudMonitoringExporter> {
    let mr = GenericNodeResource::new(location, namespace, node);
    let mut options = ExporterOptions::new(project, Arc::new(mr));
    options.default_labels = labels;
    CloudMonitoringExporter::new(options).context("failed to initialize exporter")
}
