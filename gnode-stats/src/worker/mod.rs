/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use ahash::AHashMap;
use chrono::Utc;
use log::{debug, warn};
use thiserror::Error;

use gnode_types::metrics::MetricsName;

use crate::exporter::ArcViewExporter;
use crate::measure::Measurement;
use crate::tag::TagContext;
use crate::view::{View, ViewRow};

mod report;
use report::Reporter;

mod store;
use store::ViewStore;

/// Reporting period used until one is set.
pub const DEFAULT_REPORTING_PERIOD: Duration = Duration::from_secs(10);
const MIN_REPORTING_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("view {0} has already been registered")]
    AlreadyRegistered(MetricsName),
    #[error("failed to spawn reporting thread: {0}")]
    Reporter(#[source] io::Error),
}

#[derive(Default)]
struct ViewTable {
    by_name: AHashMap<MetricsName, Arc<ViewStore>>,
    by_measure: AHashMap<MetricsName, Vec<Arc<ViewStore>>>,
}

struct WorkerInner {
    table: RwLock<ViewTable>,
    exporters: RwLock<Vec<ArcViewExporter>>,
    period: Mutex<Duration>,
}

impl WorkerInner {
    fn reporting_period(&self) -> Duration {
        *self.period.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self) {
        let stores: Vec<Arc<ViewStore>> = {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            table.by_name.values().cloned().collect()
        };
        let exporters = self
            .exporters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if exporters.is_empty() {
            return;
        }

        let end = Utc::now();
        for store in stores {
            let data = store.view_data(end);
            if data.rows.is_empty() {
                continue;
            }
            debug!(
                "exporting {} rows of view {}",
                data.rows.len(),
                data.view.name()
            );
            for exporter in &exporters {
                exporter.export_view(&data);
            }
        }
        for exporter in &exporters {
            exporter.flush();
        }
    }
}

/// Keeps registered views, aggregates measurements into them, and reports
/// their data to the registered exporters.
pub struct ViewWorker {
    inner: Arc<WorkerInner>,
    reporter: Mutex<Option<Reporter>>,
}

impl Default for ViewWorker {
    fn default() -> Self {
        ViewWorker::new()
    }
}

impl ViewWorker {
    pub fn new() -> Self {
        ViewWorker {
            inner: Arc::new(WorkerInner {
                table: RwLock::new(ViewTable::default()),
                exporters: RwLock::new(Vec::new()),
                period: Mutex::new(DEFAULT_REPORTING_PERIOD),
            }),
            reporter: Mutex::new(None),
        }
    }

    /// Register views in order. Views registered before a failing one stay registered.
    pub fn register(&self, views: &[Arc<View>]) -> Result<(), RegisterError> {
        let mut table = self
            .inner
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for view in views {
            if table.by_name.contains_key(view.name()) {
                return Err(RegisterError::AlreadyRegistered(view.name().clone()));
            }
            let store = Arc::new(ViewStore::new(view.clone()));
            table
                .by_measure
                .entry(view.measure().name().clone())
                .or_default()
                .push(store.clone());
            table.by_name.insert(view.name().clone(), store);
        }
        Ok(())
    }

    /// Unregister views by name, dropping their collected data.
    pub fn unregister(&self, names: &[&str]) {
        let mut table = self
            .inner
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for name in names {
            let Some(key) = table
                .by_name
                .keys()
                .find(|k| k.as_str() == *name)
                .cloned()
            else {
                continue;
            };
            let Some(store) = table.by_name.remove(&key) else {
                continue;
            };
            let measure = store.view().measure().name().clone();
            if let Some(stores) = table.by_measure.get_mut(&measure) {
                stores.retain(|s| !Arc::ptr_eq(s, &store));
                if stores.is_empty() {
                    table.by_measure.remove(&measure);
                }
            }
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        let table = self
            .inner
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        table.by_name.keys().any(|k| k.as_str() == name)
    }

    /// Record measurements under the tags of `ctx`.
    ///
    /// Measurements of measures without any registered view are dropped.
    pub fn record(&self, ctx: &TagContext, measurements: &[Measurement]) {
        let table = self
            .inner
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for m in measurements {
            let Some(stores) = table.by_measure.get(m.measure().name()) else {
                continue;
            };
            for store in stores {
                store.add_sample(ctx.tags(), m.value());
            }
        }
    }

    /// Current rows of a registered view.
    pub fn retrieve_data(&self, name: &str) -> Option<Vec<ViewRow>> {
        let table = self
            .inner
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        table
            .by_name
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, store)| store.rows())
    }

    /// Set the interval between two reports, a zero value resets it to the default.
    pub fn set_reporting_period(&self, period: Duration) {
        let period = if period.is_zero() {
            DEFAULT_REPORTING_PERIOD
        } else {
            period.max(MIN_REPORTING_PERIOD)
        };
        *self
            .inner
            .period
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = period;
    }

    pub fn reporting_period(&self) -> Duration {
        self.inner.reporting_period()
    }

    /// Register an exporter for all views, starting the reporting thread if needed.
    pub fn register_exporter(&self, exporter: ArcViewExporter) -> Result<(), RegisterError> {
        {
            let mut exporters = self
                .inner
                .exporters
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if exporters.iter().any(|e| Arc::ptr_eq(e, &exporter)) {
                warn!("exporter has already been registered");
            } else {
                exporters.push(exporter);
            }
        }

        let mut reporter = self.reporter.lock().unwrap_or_else(PoisonError::into_inner);
        if reporter.is_none() {
            let r = Reporter::spawn(self.inner.clone()).map_err(RegisterError::Reporter)?;
            *reporter = Some(r);
        }
        Ok(())
    }

    pub fn unregister_exporter(&self, exporter: &ArcViewExporter) {
        let mut exporters = self
            .inner
            .exporters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        exporters.retain(|e| !Arc::ptr_eq(e, exporter));
    }

    /// Report all views to all exporters right now.
    pub fn report_now(&self) {
        self.inner.report();
    }

    /// Stop the reporting thread, reporting one last time.
    pub fn stop(&self) {
        let reporter = self
            .reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reporter) = reporter {
            reporter.stop();
        }
    }
}

impl Drop for ViewWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
