/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use yaml_rust::Yaml;

pub fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' / 'integer' / 'real'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_string() {
        assert_eq!(as_string(&Yaml::String("ns1".to_string())).unwrap(), "ns1");
        assert_eq!(as_string(&Yaml::Integer(42)).unwrap(), "42");
        assert_eq!(as_string(&Yaml::Real("1.5".to_string())).unwrap(), "1.5");
        assert!(as_string(&Yaml::Null).is_err());
        assert!(as_string(&Yaml::Array(vec![])).is_err());
    }
}
