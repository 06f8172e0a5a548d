/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, SocketAddr};
#[cfg(unix)]
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::{ExportBackend, StatsConfig};
use crate::exporter::cloud::DefaultLabels;

impl ExportBackend {
    pub fn parse_udp_yaml(v: &Yaml) -> anyhow::Result<Self> {
        match v {
            Yaml::Hash(map) => {
                let mut addr: Option<SocketAddr> = None;
                let mut bind: Option<IpAddr> = None;

                gnode_yaml::foreach_kv(map, |k, v| match gnode_yaml::key::normalize(k).as_str() {
                    "address" | "addr" => {
                        addr = Some(gnode_yaml::value::as_sockaddr(v).context(format!(
                            "invalid udp peer socket address value for key {k}"
                        ))?);
                        Ok(())
                    }
                    "bind_ip" | "bind" => {
                        bind = Some(
                            gnode_yaml::value::as_ipaddr(v)
                                .context(format!("invalid value for key {k}"))?,
                        );
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;

                if let Some(addr) = addr.take() {
                    Ok(ExportBackend::Udp(addr, bind))
                } else {
                    Err(anyhow!("no target address has been set"))
                }
            }
            Yaml::String(s) => {
                let addr =
                    SocketAddr::from_str(s).map_err(|e| anyhow!("invalid SocketAddr: {e}"))?;
                Ok(ExportBackend::Udp(addr, None))
            }
            _ => Err(anyhow!("invalid yaml value for udp export backend")),
        }
    }

    #[cfg(unix)]
    pub fn parse_unix_yaml(v: &Yaml) -> anyhow::Result<Self> {
        match v {
            Yaml::Hash(map) => {
                let mut path: Option<PathBuf> = None;

                gnode_yaml::foreach_kv(map, |k, v| match gnode_yaml::key::normalize(k).as_str() {
                    "path" => {
                        path = Some(
                            gnode_yaml::value::as_absolute_path(v)
                                .context(format!("invalid value for key {k}"))?,
                        );
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;
                if let Some(path) = path.take() {
                    Ok(ExportBackend::Unix(path))
                } else {
                    Err(anyhow!("no path has been set"))
                }
            }
            Yaml::String(_) => {
                let path = gnode_yaml::value::as_absolute_path(v)?;
                Ok(ExportBackend::Unix(path))
            }
            _ => Err(anyhow!("invalid yaml value for unix export backend")),
        }
    }
}

impl StatsConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = StatsConfig::new("", "", "", "");
            gnode_yaml::foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            config.check()?;
            Ok(config)
        } else {
            Err(anyhow!("yaml value type for 'stats config' should be 'map'"))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match gnode_yaml::key::normalize(k).as_str() {
            "project_id" | "project" => {
                self.project_id = gnode_yaml::value::as_metric_tag_value(v)
                    .context(format!("invalid project id value for key {k}"))?
                    .to_string();
            }
            "location" => {
                self.location = gnode_yaml::value::as_metric_tag_value(v)
                    .context(format!("invalid location value for key {k}"))?
                    .to_string();
            }
            "namespace" => {
                self.namespace = gnode_yaml::value::as_metric_tag_value(v)
                    .context(format!("invalid namespace value for key {k}"))?
                    .to_string();
            }
            "node_id" | "node" => {
                self.node_id = gnode_yaml::value::as_metric_tag_value(v)
                    .context(format!("invalid node id value for key {k}"))?
                    .to_string();
            }
            "default_labels" => {
                if v.is_null() {
                    self.default_labels = None;
                } else {
                    let tags = gnode_yaml::value::as_static_metric_tags(v)
                        .context(format!("invalid static metrics tags value for key {k}"))?;
                    self.default_labels = Some(DefaultLabels::from(&tags));
                }
            }
            "reporting_interval" => {
                let interval = gnode_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.set_reporting_interval(interval);
            }
            "target_udp" | "backend_udp" => {
                self.backend = ExportBackend::parse_udp_yaml(v)
                    .context(format!("invalid value for key {k}"))?;
            }
            #[cfg(unix)]
            "target_unix" | "backend_unix" => {
                self.backend = ExportBackend::parse_unix_yaml(v)
                    .context(format!("invalid value for key {k}"))?;
            }
            "target" | "backend" => {
                return if let Yaml::Hash(map) = v {
                    gnode_yaml::foreach_kv(map, |k, v| match gnode_yaml::key::normalize(k).as_str() {
                        "udp" => {
                            self.backend = ExportBackend::parse_udp_yaml(v)
                                .context(format!("invalid value for key {k}"))?;
                            Ok(())
                        }
                        #[cfg(unix)]
                        "unix" => {
                            self.backend = ExportBackend::parse_unix_yaml(v)
                                .context(format!("invalid value for key {k}"))?;
                            Ok(())
                        }
                        _ => Err(anyhow!("invalid key {k}")),
                    })
                    .context(format!("invalid value for key {k}"))
                } else {
                    Err(anyhow!("yaml value type for key {k} should be 'map'"))
                };
            }
            "cache_size" => {
                self.cache_size = gnode_yaml::humanize::as_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnode_yaml::yaml_doc;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use yaml_rust::YamlLoader;

    use crate::config::DEFAULT_CACHE_SIZE;

    #[test]
    fn parse_udp_yaml_ok() {
        let yaml = yaml_doc!(
            r#"
                address: "127.0.0.1:8125"
                bind_ip: "127.0.0.1"
            "#
        );
        assert_eq!(
            ExportBackend::parse_udp_yaml(&yaml).unwrap(),
            ExportBackend::Udp(
                SocketAddr::from(([127, 0, 0, 1], 8125)),
                Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
            )
        );

        let yaml = Yaml::String("[::1]:9125".to_string());
        assert_eq!(
            ExportBackend::parse_udp_yaml(&yaml).unwrap(),
            ExportBackend::Udp(SocketAddr::from_str("[::1]:9125").unwrap(), None)
        );
    }

    #[test]
    fn parse_udp_yaml_err() {
        let yaml = yaml_doc!(
            r#"
                invalid_key: "value"
            "#
        );
        assert!(ExportBackend::parse_udp_yaml(&yaml).is_err());

        let yaml = yaml_doc!(
            r#"
                address: "invalid-addr"
            "#
        );
        assert!(ExportBackend::parse_udp_yaml(&yaml).is_err());

        let yaml = yaml_doc!(
            r#"
                bind_ip: "127.0.0.1"
            "#
        );
        assert!(ExportBackend::parse_udp_yaml(&yaml).is_err());

        let yaml = Yaml::Integer(123);
        assert!(ExportBackend::parse_udp_yaml(&yaml).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn parse_unix_yaml() {
        let yaml = yaml_doc!(
            r#"
                path: "/run/agent/metrics.sock"
            "#
        );
        assert_eq!(
            ExportBackend::parse_unix_yaml(&yaml).unwrap(),
            ExportBackend::Unix(PathBuf::from("/run/agent/metrics.sock"))
        );

        let yaml = Yaml::String("relative/path".to_string());
        assert!(ExportBackend::parse_unix_yaml(&yaml).is_err());

        let yaml = Yaml::Boolean(true);
        assert!(ExportBackend::parse_unix_yaml(&yaml).is_err());
    }

    #[test]
    fn parse_yaml_minimal() {
        let yaml = yaml_doc!(
            r#"
                project_id: p1
                location: asia-northeast1
                namespace: ns1
                node_id: node1
            "#
        );
        let config = StatsConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.project_id, "p1");
        assert_eq!(config.location, "asia-northeast1");
        assert_eq!(config.namespace, "ns1");
        assert_eq!(config.node_id, "node1");
        assert!(config.default_labels.is_none());
        assert_eq!(config.reporting_interval(), Duration::from_secs(300));
        assert_eq!(config.backend, ExportBackend::default());
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);
    }

    #[test]
    fn parse_yaml_full() {
        let yaml = yaml_doc!(
            r#"
                Project: p1
                location: asia-northeast1
                namespace: ns1
                Node: node1
                default-labels:
                  env: prod
                reporting_interval: 2m
                target:
                  udp:
                    address: "10.0.0.1:8125"
                cache_size: 4K
            "#
        );
        let config = StatsConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.project_id, "p1");
        assert_eq!(config.node_id, "node1");
        let labels = config.default_labels.as_ref().unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("env").unwrap().value, "prod");
        assert_eq!(config.reporting_interval(), Duration::from_secs(120));
        assert_eq!(
            config.backend,
            ExportBackend::Udp(SocketAddr::from(([10, 0, 0, 1], 8125)), None)
        );
        assert_eq!(config.cache_size, 4000);
    }

    #[test]
    fn parse_yaml_interval_floor() {
        let yaml = yaml_doc!(
            r#"
                project_id: p1
                location: asia-northeast1
                namespace: ns1
                node_id: node1
                reporting_interval: 10s
                default_labels: {}
            "#
        );
        let config = StatsConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.reporting_interval(), Duration::from_secs(60));
        assert!(config.default_labels.as_ref().unwrap().is_empty());
    }

    #[test]
    fn parse_yaml_label_string() {
        let yaml = yaml_doc!(
            r#"
                project_id: p1
                location: asia-northeast1
                namespace: ns1
                node_id: node1
                default_labels: "env:prod,team:infra"
                target_udp: "127.0.0.1:9125"
            "#
        );
        let config = StatsConfig::parse_yaml(&yaml).unwrap();
        let labels = config.default_labels.as_ref().unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("team").unwrap().value, "infra");

        let exporter = config.build_exporter().unwrap();
        assert_eq!(
            exporter.default_labels().display_statsd().to_string(),
            "env:prod,team:infra"
        );
    }

    #[test]
    fn parse_yaml_err() {
        let yaml = yaml_doc!(
            r#"
                project_id: p1
                location: asia-northeast1
                namespace: ns1
                node_id: node1
                unknown: 1
            "#
        );
        assert!(StatsConfig::parse_yaml(&yaml).is_err());

        let yaml = yaml_doc!(
            r#"
                project_id: p1
                location: asia-northeast1
                namespace: ns1
            "#
        );
        assert!(StatsConfig::parse_yaml(&yaml).is_err());

        let yaml = yaml_doc!(
            r#"
                project_id: "p\t1"
                location: asia-northeast1
                namespace: ns1
                node_id: node1
            "#
        );
        assert!(StatsConfig::parse_yaml(&yaml).is_err());

        let yaml = yaml_doc!(
            r#"
                project_id: p1
                location: asia-northeast1
                namespace: ns1
                node_id: node1
                target: "127.0.0.1:8125"
            "#
        );
        assert!(StatsConfig::parse_yaml(&yaml).is_err());

        let yaml = yaml_doc!("- p1");
        assert!(StatsConfig::parse_yaml(&yaml).is_err());
    }
}
