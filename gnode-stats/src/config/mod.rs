/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};

use crate::exporter::MetricsSink;
use crate::exporter::cloud::{CloudMonitoringExporter, DefaultLabels, ExporterOptions};
use crate::registry::{self, DEFAULT_REPORTING_INTERVAL, MetricsRegistry};
use crate::resource::GenericNodeResource;

#[cfg(feature = "yaml")]
mod yaml;

pub const DEFAULT_CACHE_SIZE: usize = 1400;

const DEFAULT_UDP_PORT: u16 = 8125;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportBackend {
    Udp(SocketAddr, Option<IpAddr>),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Default for ExportBackend {
    fn default() -> Self {
        ExportBackend::Udp(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_UDP_PORT),
            None,
        )
    }
}

impl ExportBackend {
    pub(crate) fn build_sink(&self, cache_size: usize) -> io::Result<MetricsSink> {
        match self {
            ExportBackend::Udp(addr, bind) => {
                let bind_ip = match bind {
                    Some(ip) => *ip,
                    None => match addr {
                        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                    },
                };
                let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0))?;
                Ok(MetricsSink::udp_with_capacity(*addr, socket, cache_size))
            }
            #[cfg(unix)]
            ExportBackend::Unix(path) => {
                let socket = UnixDatagram::unbound()?;
                Ok(MetricsSink::unix_with_capacity(
                    path.clone(),
                    socket,
                    cache_size,
                ))
            }
        }
    }
}

/// Everything needed to build an exporter and a registry for one node.
#[derive(Clone, Debug)]
pub struct StatsConfig {
    pub project_id: String,
    pub location: String,
    pub namespace: String,
    pub node_id: String,
    pub default_labels: Option<DefaultLabels>,
    pub(crate) reporting_interval: Duration,
    pub backend: ExportBackend,
    pub cache_size: usize,
}

impl StatsConfig {
    pub fn new(project_id: &str, location: &str, namespace: &str, node_id: &str) -> Self {
        StatsConfig {
            project_id: project_id.to_string(),
            location: location.to_string(),
            namespace: namespace.to_string(),
            node_id: node_id.to_string(),
            default_labels: None,
            reporting_interval: DEFAULT_REPORTING_INTERVAL,
            backend: ExportBackend::default(),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }

    #[inline]
    pub fn reporting_interval(&self) -> Duration {
        self.reporting_interval
    }

    /// Set the reporting interval, never less than one minute.
    pub fn set_reporting_interval(&mut self, interval: Duration) {
        self.reporting_interval = registry::clamp_reporting_interval(interval);
    }

    pub(crate) fn check(&self) -> anyhow::Result<()> {
        if self.project_id.is_empty() {
            return Err(anyhow!("project id is not set"));
        }
        if self.location.is_empty() {
            return Err(anyhow!("location is not set"));
        }
        if self.namespace.is_empty() {
            return Err(anyhow!("namespace is not set"));
        }
        if self.node_id.is_empty() {
            return Err(anyhow!("node id is not set"));
        }
        Ok(())
    }

    pub fn build_exporter(&self) -> anyhow::Result<CloudMonitoringExporter> {
        self.check()?;
        let mr = GenericNodeResource::new(&self.location, &self.namespace, &self.node_id);
        let mut options = ExporterOptions::new(&self.project_id, Arc::new(mr));
        options.default_labels = self.default_labels.clone();
        options.backend = self.backend.clone();
        options.cache_size = self.cache_size;
        CloudMonitoringExporter::new(options).context("failed to build exporter")
    }

    /// Build the exporter and a registry with all views registered to it.
    pub fn build_registry(&self) -> anyhow::Result<MetricsRegistry> {
        let exporter = self.build_exporter()?;
        let registry = MetricsRegistry::new()?.with_reporting_interval(self.reporting_interval);
        registry
            .register_views(Arc::new(exporter))
            .context("failed to register views")?;
        Ok(registry)
    }
}
