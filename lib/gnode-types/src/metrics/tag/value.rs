/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use crate::metrics::{ParseError, check_tag_length, chars_printable_ascii};

/// A tag value of printable ascii chars, at most 255 bytes.
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct MetricTagValue(String);

impl MetricTagValue {
    pub const EMPTY: MetricTagValue = MetricTagValue(String::new());

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn parse_buf(buf: &[u8]) -> Result<Self, ParseError> {
        let s = std::str::from_utf8(buf).map_err(|_| ParseError::InvalidUtf8)?;
        MetricTagValue::from_str(s)
    }
}

impl FromStr for MetricTagValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_tag_length(s)?;
        chars_printable_ascii(s)?;
        Ok(MetricTagValue(s.to_string()))
    }
}

impl fmt::Display for MetricTagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
