/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::view::ViewData;

mod sink;
pub(crate) use sink::MetricsSink;

mod formatter;

pub mod cloud;

/// Receives view data on every report of the view worker.
pub trait ViewExporter: Send + Sync {
    fn export_view(&self, data: &ViewData);

    /// Called once after all views of a report have been exported.
    fn flush(&self) {}
}

pub type ArcViewExporter = Arc<dyn ViewExporter>;
