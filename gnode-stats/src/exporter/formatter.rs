/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use gnode_types::metrics::MetricTagMap;

/// Pre-encoded `key:value` pairs shared by many lines.
#[derive(Clone, Default)]
pub(super) struct TagGroup {
    buf: Vec<u8>,
}

impl TagGroup {
    pub(super) fn add_tag<T: AsRef<str>>(&mut self, key: &str, value: T) {
        if !self.buf.is_empty() {
            self.buf.push(b',');
        }
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(b':');
        push_tag_value(&mut self.buf, value.as_ref());
    }

    pub(super) fn add_tag_map(&mut self, tags: &MetricTagMap) {
        for (k, v) in tags.iter() {
            self.add_tag(k.as_str(), v.as_str());
        }
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub(super) fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

/// Tag separators inside a value are written as `_`.
fn push_tag_value(buf: &mut Vec<u8>, value: &str) {
    buf.extend(value.bytes().map(|b| match b {
        b',' | b'|' => b'_',
        _ => b,
    }));
}

/// Write one gauge line: `name:value|g|#common,local`.
pub(super) fn format_gauge(
    buf: &mut Vec<u8>,
    name: &str,
    value: i64,
    common_tags: &TagGroup,
    local_tags: &MetricTagMap,
) {
    buf.extend_from_slice(name.as_bytes());
    buf.push(b':');
    buf.extend_from_slice(itoa::Buffer::new().format(value).as_bytes());
    buf.extend_from_slice(b"|g");

    if common_tags.len() == 0 && local_tags.is_empty() {
        return;
    }
    buf.extend_from_slice(b"|#");

    let mut append_tags = false;
    if common_tags.len() > 0 {
        buf.extend_from_slice(common_tags.as_bytes());
        append_tags = true;
    }
    for (k, v) in local_tags.iter() {
        if append_tags {
            buf.push(b',');
        }
        buf.extend_from_slice(k.as_str().as_bytes());
        buf.push(b':');
        push_tag_value(buf, v.as_str());
        append_tags = true;
    }
}
