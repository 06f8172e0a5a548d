/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;

pub const GENERIC_NODE_RESOURCE_TYPE: &str = "generic_node";

pub const LABEL_LOCATION: &str = "location";
pub const LABEL_NAMESPACE: &str = "namespace";
pub const LABEL_NODE_ID: &str = "node_id";

/// The entity that all exported time series are reported against.
pub trait MonitoredResource: Send + Sync {
    /// Returns the resource type name and its labels.
    fn monitored_resource(&self) -> (&str, BTreeMap<String, String>);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericNodeResource {
    location: String,
    namespace: String,
    node_id: String,
}

impl GenericNodeResource {
    pub fn new(location: &str, namespace: &str, node_id: &str) -> Self {
        GenericNodeResource {
            location: location.to_string(),
            namespace: namespace.to_string(),
            node_id: node_id.to_string(),
        }
    }

    #[inline]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl MonitoredResource for GenericNodeResource {
    fn monitored_resource(&self) -> (&str, BTreeMap<String, String>) {
        let labels = BTreeMap::from([
            (LABEL_LOCATION.to_string(), self.location.clone()),
            (LABEL_NAMESPACE.to_string(), self.namespace.clone()),
            (LABEL_NODE_ID.to_string(), self.node_id.clone()),
        ]);
        (GENERIC_NODE_RESOURCE_TYPE, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_node_labels() {
        let mr = GenericNodeResource::new("asia-northeast1", "ns1", "node1");
        let (r#type, labels) = mr.monitored_resource();
        assert_eq!(r#type, "generic_node");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get("location").unwrap(), "asia-northeast1");
        assert_eq!(labels.get("namespace").unwrap(), "ns1");
        assert_eq!(labels.get("node_id").unwrap(), "node1");
    }

    #[test]
    fn generic_node_empty_values() {
        let mr = GenericNodeResource::new("", "", "");
        let (_, labels) = mr.monitored_resource();
        let keys: Vec<&str> = labels.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["location", "namespace", "node_id"]);
        assert!(labels.values().all(|v| v.is_empty()));
    }
}
