//! Read-only view of the device topology
//!
//! Devices are referenced by opaque ids. The maintenance tracker only needs
//! to resolve switch -> interfaces, interface -> switch, interface -> link
//! and link -> endpoints, which is what [`Topology`] exposes. The topology
//! itself is owned elsewhere; [`StaticTopology`] is loaded from the
//! configuration directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::config::TopologyConfig;

/// Externally visible device health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityStatus {
    Up,
    Down,
}

pub trait Topology: Send + Sync {
    fn has_switch(&self, switch_id: &str) -> bool;
    fn has_interface(&self, interface_id: &str) -> bool;
    fn has_link(&self, link_id: &str) -> bool;

    /// Interfaces of a switch, empty for unknown switches
    fn switch_interfaces(&self, switch_id: &str) -> Vec<String>;

    /// Switch owning an interface
    fn interface_switch(&self, interface_id: &str) -> Option<String>;

    /// Link attached to an interface, if any
    fn interface_link(&self, interface_id: &str) -> Option<String>;

    fn link_endpoints(&self, link_id: &str) -> Option<(String, String)>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    switches: HashMap<String, Vec<String>>,
    interface_owner: HashMap<String, String>,
    interface_link: HashMap<String, String>,
    links: HashMap<String, (String, String)>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switch<I, S>(mut self, switch_id: &str, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_switch(switch_id, interfaces);
        self
    }

    pub fn with_link(mut self, link_id: &str, endpoint_a: &str, endpoint_b: &str) -> Self {
        self.add_link(link_id, endpoint_a, endpoint_b);
        self
    }

    pub fn add_switch<I, S>(&mut self, switch_id: &str, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.switches.entry(switch_id.to_string()).or_default();
        for interface in interfaces {
            let interface = interface.into();
            self.interface_owner
                .insert(interface.clone(), switch_id.to_string());
            if !entry.contains(&interface) {
                entry.push(interface);
            }
        }
    }

    pub fn add_link(&mut self, link_id: &str, endpoint_a: &str, endpoint_b: &str) {
        for endpoint in [endpoint_a, endpoint_b] {
            if !self.interface_owner.contains_key(endpoint) {
                warn!(
                    "Link {} references interface {} which belongs to no known switch",
                    link_id, endpoint
                );
            }
            self.interface_link
                .insert(endpoint.to_string(), link_id.to_string());
        }
        self.links.insert(
            link_id.to_string(),
            (endpoint_a.to_string(), endpoint_b.to_string()),
        );
    }

    pub fn from_config(config: &TopologyConfig) -> Self {
        let mut topology = Self::new();
        for (switch_id, switch) in &config.switches {
            topology.add_switch(switch_id, switch.interfaces.iter().cloned());
        }
        for (link_id, link) in &config.links {
            topology.add_link(link_id, &link.endpoint_a, &link.endpoint_b);
        }
        topology
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    pub fn interface_count(&self) -> usize {
        self.interface_owner.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl Topology for StaticTopology {
    fn has_switch(&self, switch_id: &str) -> bool {
        self.switches.contains_key(switch_id)
    }

    fn has_interface(&self, interface_id: &str) -> bool {
        self.interface_owner.contains_key(interface_id)
    }

    fn has_link(&self, link_id: &str) -> bool {
        self.links.contains_key(link_id)
    }

    fn switch_interfaces(&self, switch_id: &str) -> Vec<String> {
        self.switches.get(switch_id).cloned().unwrap_or_default()
    }

    fn interface_switch(&self, interface_id: &str) -> Option<String> {
        self.interface_owner.get(interface_id).cloned()
    }

    fn interface_link(&self, interface_id: &str) -> Option<String> {
        self.interface_link.get(interface_id).cloned()
    }

    fn link_endpoints(&self, link_id: &str) -> Option<(String, String)> {
        self.links.get(link_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinkConfig, SwitchConfig};

    #[test]
    fn test_builder_resolves_relations() {
        let topology = StaticTopology::new()
            .with_switch("s1", ["s1:1", "s1:2"])
            .with_switch("s2", ["s2:1"])
            .with_link("l1", "s1:1", "s2:1");

        assert!(topology.has_switch("s1"));
        assert!(topology.has_interface("s2:1"));
        assert!(topology.has_link("l1"));
        assert_eq!(topology.switch_interfaces("s1"), vec!["s1:1", "s1:2"]);
        assert_eq!(topology.interface_switch("s1:2").as_deref(), Some("s1"));
        assert_eq!(topology.interface_link("s2:1").as_deref(), Some("l1"));
        assert_eq!(topology.interface_link("s1:2"), None);
        assert_eq!(
            topology.link_endpoints("l1"),
            Some(("s1:1".to_string(), "s2:1".to_string()))
        );
        assert!(topology.switch_interfaces("unknown").is_empty());
    }

    #[test]
    fn test_from_config() {
        let mut config = TopologyConfig::default();
        config.switches.insert(
            "s1".into(),
            SwitchConfig {
                interfaces: vec!["s1:1".into()],
            },
        );
        config.switches.insert(
            "s2".into(),
            SwitchConfig {
                interfaces: vec!["s2:1".into()],
            },
        );
        config.links.insert(
            "l1".into(),
            LinkConfig {
                endpoint_a: "s1:1".into(),
                endpoint_b: "s2:1".into(),
            },
        );

        let topology = StaticTopology::from_config(&config);
        assert_eq!(topology.switch_count(), 2);
        assert_eq!(topology.interface_count(), 2);
        assert_eq!(topology.link_count(), 1);
        assert_eq!(topology.interface_link("s1:1").as_deref(), Some("l1"));
    }
}
