/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod name;
pub use name::MetricTagName;

mod value;
pub use value::MetricTagValue;

mod map;
pub use map::{DisplayTagMap, MetricTagMap};
