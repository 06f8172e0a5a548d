/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use crate::metrics::{ParseError, check_tag_length, chars_allowed_in_opentsdb};

#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct MetricTagName(String);

impl MetricTagName {
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn parse_buf(buf: &[u8]) -> Result<Self, ParseError> {
        let s = std::str::from_utf8(buf).map_err(|_| ParseError::InvalidUtf8)?;
        MetricTagName::from_str(s)
    }
}

impl FromStr for MetricTagName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        check_tag_length(s)?;
        chars_allowed_in_opentsdb(s)?;
        Ok(MetricTagName(s.to_string()))
    }
}

impl fmt::Display for MetricTagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_tag_name() {
        assert_eq!(
            MetricTagName::from_str("node_id").unwrap(),
            MetricTagName("node_id".to_string())
        );

        assert_eq!(MetricTagName::from_str(""), Err(ParseError::Empty));
        assert!(MetricTagName::from_str("a=b").is_err());
        assert!(MetricTagName::from_str(&"k".repeat(256)).is_err());
        assert!(MetricTagName::parse_buf(b"\xff\xfe").is_err());
    }
}
