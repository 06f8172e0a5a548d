/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashMap;
use chrono::{DateTime, Utc};

use gnode_types::metrics::MetricTagMap;

use crate::view::{AggregationData, View, ViewData, ViewRow};

/// Cumulative rows of one registered view.
pub(super) struct ViewStore {
    view: Arc<View>,
    start: DateTime<Utc>,
    rows: Mutex<AHashMap<MetricTagMap, AggregationData>>,
}

impl ViewStore {
    pub(super) fn new(view: Arc<View>) -> Self {
        ViewStore {
            view,
            start: Utc::now(),
            rows: Mutex::new(AHashMap::default()),
        }
    }

    #[inline]
    pub(super) fn view(&self) -> &Arc<View> {
        &self.view
    }

    pub(super) fn add_sample(&self, tags: &MetricTagMap, value: i64) {
        let key = tags.select(self.view.tag_keys());
        let aggregation = self.view.aggregation();

        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.entry(key)
            .or_insert_with(|| AggregationData::new(aggregation))
            .add_sample(value);
    }

    pub(super) fn rows(&self) -> Vec<ViewRow> {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<ViewRow> = rows
            .iter()
            .map(|(tags, data)| ViewRow {
                tags: tags.clone(),
                data: *data,
            })
            .collect();
        rows.sort_by(|a, b| a.tags.cmp(&b.tags));
        rows
    }

    pub(super) fn view_data(&self, end: DateTime<Utc>) -> ViewData {
        ViewData {
            view: self.view.clone(),
            start: self.start,
            end,
            rows: self.rows(),
        }
    }
}
