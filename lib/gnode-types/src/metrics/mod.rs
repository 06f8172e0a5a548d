/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

mod name;
pub use name::MetricsName;

mod tag;
pub use tag::{DisplayTagMap, MetricTagMap, MetricTagName, MetricTagValue};

/// Max length in bytes of a tag name or a tag value.
pub const MAX_TAG_LENGTH: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty string")]
    Empty,
    #[error("too long: {0} bytes")]
    TooLong(usize),
    #[error("invalid graphic char: {0}")]
    InvalidGraphic(char),
    #[error("not alpha numeric char")]
    NotAlphaNumeric,
    #[error("invalid utf-8 encoding")]
    InvalidUtf8,
    #[error("not printable ascii char")]
    NotPrintableAscii,
}

fn chars_allowed_in_opentsdb(s: &str) -> Result<(), ParseError> {
    for c in s.chars() {
        // Same character range as OpenTSDB
        // http://opentsdb.net/docs/build/html/user_guide/writing/index.html#metrics-and-tags
        if c.is_ascii() {
            match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '/' => {}
                _ => {
                    return if c.is_ascii_graphic() {
                        Err(ParseError::InvalidGraphic(c))
                    } else {
                        Err(ParseError::NotAlphaNumeric)
                    };
                }
            }
        } else if !c.is_alphanumeric() {
            return Err(ParseError::NotAlphaNumeric);
        }
    }
    Ok(())
}

/// Tag values may hold any printable ascii char, space included.
fn chars_printable_ascii(s: &str) -> Result<(), ParseError> {
    if s.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(ParseError::NotPrintableAscii)
    }
}

fn check_tag_length(s: &str) -> Result<(), ParseError> {
    if s.len() > MAX_TAG_LENGTH {
        Err(ParseError::TooLong(s.len()))
    } else {
        Ok(())
    }
}
