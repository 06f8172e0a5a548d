/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use gnode_types::metrics::{MetricTagMap, MetricTagName, MetricTagValue};

pub fn as_metric_tag_value(v: &Yaml) -> anyhow::Result<MetricTagValue> {
    let s = crate::value::as_string(v).context("invalid metrics tag yaml value")?;
    MetricTagValue::from_str(&s).map_err(|e| anyhow!("invalid metrics tag value: {e}"))
}

/// Parse tags from a map, or from a `k1:v1,k2:v2` string.
pub fn as_static_metric_tags(v: &Yaml) -> anyhow::Result<MetricTagMap> {
    if let Yaml::String(s) = v {
        let mut tags = MetricTagMap::default();
        tags.parse_statsd(s.as_bytes())
            .map_err(|e| anyhow!("invalid metrics tags string: {e}"))?;
        Ok(tags)
    } else if let Yaml::Hash(map) = v {
        let mut tags = MetricTagMap::default();
        crate::foreach_kv(map, |k, v| {
            let name = MetricTagName::from_str(k)
                .map_err(|e| anyhow!("invalid metrics tag name: {e}"))?;
            let value = as_metric_tag_value(v)?;
            if tags.insert(name, value).is_some() {
                Err(anyhow!("found duplicate value for tag name {k}"))
            } else {
                Ok(())
            }
        })?;
        Ok(tags)
    } else {
        Err(anyhow!(
            "the yaml value type for 'static metric tags' should be 'map' or 'string'"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    #[test]
    fn t_tag_value() {
        assert_eq!(as_metric_tag_value(&Yaml::Integer(3)).unwrap().as_str(), "3");
        let v = Yaml::String("a\tb".to_string());
        assert!(as_metric_tag_value(&v).is_err());
    }

    #[test]
    fn t_static_tags() {
        let yaml = yaml_doc!(
            r#"
                env: prod
                zone: 1
            "#
        );
        let tags = as_static_metric_tags(&yaml).unwrap();
        assert_eq!(tags.display_statsd().to_string(), "env:prod,zone:1");

        let yaml = yaml_doc!(
            r#"
                env: "bad\tvalue"
            "#
        );
        assert!(as_static_metric_tags(&yaml).is_err());

        let yaml = Yaml::String("env:prod,zone:1".to_string());
        let tags = as_static_metric_tags(&yaml).unwrap();
        assert_eq!(tags.display_statsd().to_string(), "env:prod,zone:1");

        let yaml = Yaml::String("env=prod".to_string());
        assert!(as_static_metric_tags(&yaml).is_err());

        let yaml = yaml_doc!("- a");
        assert!(as_static_metric_tags(&yaml).is_err());
    }
}
