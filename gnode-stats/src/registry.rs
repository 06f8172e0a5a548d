/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::warn;

use crate::exporter::ArcViewExporter;
use crate::measure::{CACHE_STATUS, DATABASE_STATUS, LOG_SIZE, Measure, MeasureUnit};
use crate::tag::{TagContext, TagError, TagKey};
use crate::view::{Aggregation, View, ViewRow};
use crate::worker::{RegisterError, ViewWorker};

pub const SOURCE_KEY: &str = "source";

pub const DEFAULT_REPORTING_INTERVAL: Duration = Duration::from_secs(300);
pub const MIN_REPORTING_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) fn clamp_reporting_interval(interval: Duration) -> Duration {
    if interval < MIN_REPORTING_INTERVAL {
        warn!(
            "reporting interval {interval:?} is too small, use {MIN_REPORTING_INTERVAL:?} instead"
        );
        MIN_REPORTING_INTERVAL
    } else {
        interval
    }
}

/// Measures and views of a node, recorded through a view worker.
pub struct MetricsRegistry {
    worker: ViewWorker,
    reporting_interval: Duration,
    source_key: TagKey,
    log_size: Arc<Measure>,
    cache_status: Arc<Measure>,
    database_status: Arc<Measure>,
    log_size_views: Vec<Arc<View>>,
    status_views: Vec<Arc<View>>,
}

impl MetricsRegistry {
    pub fn new() -> anyhow::Result<Self> {
        let source_key = TagKey::new(SOURCE_KEY)?;

        let log_size = Measure::new(LOG_SIZE, "logSize", MeasureUnit::Byte)
            .context("invalid log size measure")?;
        let cache_status = Measure::new(CACHE_STATUS, "redisStatus", MeasureUnit::Count)
            .context("invalid cache status measure")?;
        let database_status = Measure::new(DATABASE_STATUS, "spannerStatus", MeasureUnit::Count)
            .context("invalid database status measure")?;

        let keys = [source_key.clone()];
        let log_size_views = vec![Arc::new(View::new(
            LOG_SIZE,
            "log size",
            log_size.clone(),
            Aggregation::Sum,
            &keys,
        )?)];
        let status_views = vec![
            Arc::new(View::new(
                CACHE_STATUS,
                "redis status",
                cache_status.clone(),
                Aggregation::Count,
                &keys,
            )?),
            Arc::new(View::new(
                DATABASE_STATUS,
                "spanner status",
                database_status.clone(),
                Aggregation::Count,
                &keys,
            )?),
        ];

        Ok(MetricsRegistry {
            worker: ViewWorker::new(),
            reporting_interval: DEFAULT_REPORTING_INTERVAL,
            source_key,
            log_size,
            cache_status,
            database_status,
            log_size_views,
            status_views,
        })
    }

    /// Set the interval used by `register_views`, never less than one minute.
    pub fn with_reporting_interval(mut self, interval: Duration) -> Self {
        self.reporting_interval = clamp_reporting_interval(interval);
        self
    }

    #[inline]
    pub fn reporting_interval(&self) -> Duration {
        self.reporting_interval
    }

    /// Register the exporter, then the log size views, then the status views.
    ///
    /// Views registered before a failure are kept.
    pub fn register_views(&self, exporter: ArcViewExporter) -> Result<(), RegisterError> {
        self.worker.set_reporting_period(self.reporting_interval);
        self.worker.register_exporter(exporter)?;
        self.worker.register(&self.log_size_views)?;
        self.worker.register(&self.status_views)
    }

    /// Record the byte size of a log entry from `source_id`.
    pub fn record_measurement(&self, source_id: &str, log_size: i64) -> Result<(), TagError> {
        let ctx = TagContext::background().upsert(&self.source_key, source_id)?;
        self.worker.record(&ctx, &[self.log_size.m(log_size)]);
        Ok(())
    }

    /// Count one cache backend status event of `source_id`.
    pub fn count_cache_status(&self, ctx: &TagContext, source_id: &str) -> Result<(), TagError> {
        let ctx = ctx.upsert(&self.source_key, source_id)?;
        self.worker.record(&ctx, &[self.cache_status.m(1)]);
        Ok(())
    }

    /// Count one database status event of `source_id`.
    pub fn count_database_status(
        &self,
        ctx: &TagContext,
        source_id: &str,
    ) -> Result<(), TagError> {
        let ctx = ctx.upsert(&self.source_key, source_id)?;
        self.worker.record(&ctx, &[self.database_status.m(1)]);
        Ok(())
    }

    /// Report all views to the exporters now.
    pub fn flush(&self) {
        self.worker.report_now();
    }

    pub fn retrieve_data(&self, view_name: &str) -> Option<Vec<ViewRow>> {
        self.worker.retrieve_data(view_name)
    }

    #[inline]
    pub fn worker(&self) -> &ViewWorker {
        &self.worker
    }

    #[inline]
    pub fn source_key(&self) -> &TagKey {
        &self.source_key
    }

    #[inline]
    pub fn log_size_measure(&self) -> &Arc<Measure> {
        &self.log_size
    }

    #[inline]
    pub fn cache_status_measure(&self) -> &Arc<Measure> {
        &self.cache_status
    }

    #[inline]
    pub fn database_status_measure(&self) -> &Arc<Measure> {
        &self.database_status
    }

    #[inline]
    pub fn log_size_views(&self) -> &[Arc<View>] {
        &self.log_size_views
    }

    #[inline]
    pub fn status_views(&self) -> &[Arc<View>] {
        &self.status_views
    }

    /// Stop the reporting thread after a last report.
    pub fn stop(&self) {
        self.worker.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;

    use gnode_types::metrics::{MetricTagMap, MetricTagName, MetricTagValue};

    use crate::exporter::MetricsSink;
    use crate::exporter::cloud::{CloudMonitoringExporter, DefaultLabels, ExporterOptions};
    use crate::resource::GenericNodeResource;
    use crate::view::AggregationData;

    fn buf_exporter() -> (Arc<CloudMonitoringExporter>, Arc<Mutex<Vec<u8>>>) {
        let mr = GenericNodeResource::new("asia-northeast1", "ns1", "node1");
        let mut options = ExporterOptions::new("p1", Arc::new(mr));
        options.default_labels = Some(DefaultLabels::new());
        let buf = Arc::new(Mutex::new(Vec::default()));
        let sink = MetricsSink::buf_with_capacity(buf.clone(), 4096);
        let exporter = CloudMonitoringExporter::with_sink(options, sink).unwrap();
        (Arc::new(exporter), buf)
    }

    fn source_tags(source: &str) -> MetricTagMap {
        let mut tags = MetricTagMap::default();
        tags.insert(
            MetricTagName::from_str(SOURCE_KEY).unwrap(),
            MetricTagValue::from_str(source).unwrap(),
        );
        tags
    }

    fn registered() -> (MetricsRegistry, Arc<Mutex<Vec<u8>>>) {
        let registry = MetricsRegistry::new()
            .unwrap()
            .with_reporting_interval(Duration::from_secs(3600));
        let (exporter, buf) = buf_exporter();
        registry.register_views(exporter).unwrap();
        (registry, buf)
    }

    #[test]
    fn views() {
        let registry = MetricsRegistry::new().unwrap();
        let names: Vec<&str> = registry
            .log_size_views()
            .iter()
            .chain(registry.status_views())
            .map(|v| v.name().as_str())
            .collect();
        assert_eq!(names, ["logsize", "redis-status", "spanner-status"]);
        assert_eq!(registry.log_size_views()[0].aggregation(), Aggregation::Sum);
        assert_eq!(registry.status_views()[0].aggregation(), Aggregation::Count);
        assert_eq!(registry.log_size_measure().unit(), MeasureUnit::Byte);
        assert_eq!(registry.cache_status_measure().unit(), MeasureUnit::Count);
        assert_eq!(
            registry.database_status_measure().name().as_str(),
            "spanner-status"
        );
        for view in registry.log_size_views().iter().chain(registry.status_views()) {
            assert_eq!(view.tag_keys().len(), 1);
            assert_eq!(view.tag_keys()[0].as_str(), SOURCE_KEY);
        }
    }

    #[test]
    fn reporting_interval() {
        let registry = MetricsRegistry::new().unwrap();
        assert_eq!(registry.reporting_interval(), DEFAULT_REPORTING_INTERVAL);
        let registry = registry.with_reporting_interval(Duration::from_secs(1));
        assert_eq!(registry.reporting_interval(), MIN_REPORTING_INTERVAL);

        let (exporter, _) = buf_exporter();
        registry.register_views(exporter).unwrap();
        assert_eq!(registry.worker().reporting_period(), MIN_REPORTING_INTERVAL);
        registry.stop();
    }

    #[test]
    fn end_to_end() {
        let (registry, buf) = registered();
        registry.record_measurement("source-a", 1024).unwrap();

        let rows = registry.retrieve_data("logsize").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tags, source_tags("source-a"));
        assert_eq!(rows[0].data, AggregationData::Sum(1024));

        registry.flush();
        let buf = buf.lock().unwrap();
        assert_eq!(
            buf.as_slice(),
            b"custom.googleapis.com/logsize:1024|g|#project_id:p1,resource_type:generic_node,\
location:asia-northeast1,namespace:ns1,node_id:node1,source:source-a"
        );
    }

    #[test]
    fn status_counts() {
        let (registry, _) = registered();
        let user = TagKey::new("user").unwrap();
        let ctx = TagContext::background().upsert(&user, "u1").unwrap();

        registry.count_cache_status(&ctx, "source-a").unwrap();
        registry.count_cache_status(&ctx, "source-a").unwrap();
        registry.count_cache_status(&ctx, "source-b").unwrap();
        registry.count_database_status(&ctx, "source-b").unwrap();
        // the caller context is left untouched
        assert_eq!(ctx.get(registry.source_key()), None);

        let mut rows = registry.retrieve_data("redis-status").unwrap();
        rows.sort_by(|a, b| a.tags.cmp(&b.tags));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tags, source_tags("source-a"));
        assert_eq!(rows[0].data, AggregationData::Count(2));
        assert_eq!(rows[1].tags, source_tags("source-b"));
        assert_eq!(rows[1].data, AggregationData::Count(1));

        let rows = registry.retrieve_data("spanner-status").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data, AggregationData::Count(1));

        assert_eq!(registry.retrieve_data("logsize"), Some(Vec::new()));
    }

    #[test]
    fn record_without_source_tag() {
        let (registry, _) = registered();
        let ctx = TagContext::background();
        registry
            .worker()
            .record(&ctx, &[registry.log_size_measure().m(8)]);

        let rows = registry.retrieve_data("logsize").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].tags.is_empty());
        assert_eq!(rows[0].data, AggregationData::Sum(8));
    }

    #[test]
    fn printable_source_ids() {
        let (registry, buf) = registered();
        let ctx = TagContext::background();
        let sources = ["source a", "host 1", "job:42", "user@example", "worker#3", "a,b"];
        for source in sources {
            registry.record_measurement(source, 1).unwrap();
            registry.count_cache_status(&ctx, source).unwrap();
            registry.count_database_status(&ctx, source).unwrap();
        }

        for name in ["logsize", "redis-status", "spanner-status"] {
            let rows = registry.retrieve_data(name).unwrap();
            assert_eq!(rows.len(), sources.len());
            for source in sources {
                assert!(rows.iter().any(|r| r.tags == source_tags(source)));
            }
        }

        registry.flush();
        let buf = buf.lock().unwrap();
        let lines: Vec<&[u8]> = buf.split(|b| *b == b'\n').collect();
        assert_eq!(lines.len(), 3 * sources.len());
        for line in lines {
            // one `|g|#` section and one tag per label, separators in values replaced
            assert_eq!(line.iter().filter(|b| **b == b'|').count(), 2);
            assert_eq!(line.iter().filter(|b| **b == b',').count(), 5);
        }
    }

    #[test]
    fn invalid_tag() {
        let (mut registry, _) = registered();
        let ctx = TagContext::background();

        assert!(matches!(
            registry.record_measurement("source\ta", 1),
            Err(TagError::InvalidValue { .. })
        ));
        assert!(matches!(
            registry.count_cache_status(&ctx, &"s".repeat(256)),
            Err(TagError::InvalidValue { .. })
        ));

        registry.source_key = TagKey::new_unchecked("bad key");
        assert!(matches!(
            registry.record_measurement("source-a", 1),
            Err(TagError::InvalidKey { .. })
        ));
        assert!(registry.count_cache_status(&ctx, "source-a").is_err());
        assert!(registry.count_database_status(&ctx, "source-a").is_err());

        assert_eq!(registry.retrieve_data("logsize"), Some(Vec::new()));
        assert_eq!(registry.retrieve_data("redis-status"), Some(Vec::new()));
        assert_eq!(registry.retrieve_data("spanner-status"), Some(Vec::new()));
    }

    #[test]
    fn register_twice() {
        let (registry, _) = registered();
        let (exporter, _) = buf_exporter();
        let e = registry.register_views(exporter).unwrap_err();
        assert!(matches!(e, RegisterError::AlreadyRegistered(name) if name.as_str() == "logsize"));
    }

    #[test]
    fn unregistered_records_nothing() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_measurement("source-a", 1).unwrap();
        assert_eq!(registry.retrieve_data("logsize"), None);
    }

    #[test]
    fn concurrent_recording() {
        let (registry, _) = registered();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let source = if i % 2 == 0 { "even" } else { "odd" };
                    for _ in 0..100 {
                        registry.record_measurement(source, 2).unwrap();
                        registry
                            .count_cache_status(&TagContext::background(), source)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let rows = registry.retrieve_data("logsize").unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.data, AggregationData::Sum(800));
        }
        let rows = registry.retrieve_data("redis-status").unwrap();
        for row in &rows {
            assert_eq!(row.data, AggregationData::Count(400));
        }
    }
}
