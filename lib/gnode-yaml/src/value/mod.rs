/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod fs;
mod metrics;
mod net;
mod primary;

pub use fs::as_absolute_path;
pub use metrics::{as_metric_tag_value, as_static_metric_tags};
pub use net::{as_ipaddr, as_sockaddr};
pub use primary::as_string;
