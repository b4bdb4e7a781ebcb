// File: manager/src/maintenance_tracker.rs
//
// Reference-counted overlay telling whether a switch, interface or link is
// down because of maintenance. Several running windows may claim the same
// device, so each device carries a count rather than a flag.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::constants::MAINTENANCE_REASON;
use crate::errors::{MaintenanceError, Result};
use crate::services::event_service::{
    AffectedDevices, EventSink, InterruptionEvent, InterruptionKind,
};
use crate::topology::{EntityStatus, Topology};
use crate::window::MaintenanceWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Switch,
    Interface,
    Link,
}

impl FromStr for DeviceKind {
    type Err = MaintenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "switch" | "switches" => Ok(DeviceKind::Switch),
            "interface" | "interfaces" => Ok(DeviceKind::Interface),
            "link" | "links" => Ok(DeviceKind::Link),
            other => Err(MaintenanceError::Validation(format!(
                "Unknown device kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Switch => f.write_str("switch"),
            DeviceKind::Interface => f.write_str("interface"),
            DeviceKind::Link => f.write_str("link"),
        }
    }
}

/// Point-in-time copy of the tracker state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceSnapshot {
    pub switches: BTreeMap<String, usize>,
    pub interfaces: BTreeMap<String, usize>,
    pub links: BTreeMap<String, usize>,
    pub active_windows: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct MaintenanceCounts {
    switches: HashMap<String, usize>,
    interfaces: HashMap<String, usize>,
    links: HashMap<String, usize>,
    active_windows: HashSet<String>,
}

fn count(map: &HashMap<String, usize>, id: &str) -> usize {
    map.get(id).copied().unwrap_or(0)
}

fn increment(map: &mut HashMap<String, usize>, ids: &[String]) {
    for id in ids {
        *map.entry(id.clone()).or_insert(0) += 1;
    }
}

/// Fails without touching `map` if any count would drop below zero
fn check_decrement(map: &HashMap<String, usize>, ids: &[String], window_id: &str) -> Result<()> {
    let mut needed: HashMap<&str, usize> = HashMap::new();
    for id in ids {
        *needed.entry(id.as_str()).or_insert(0) += 1;
    }
    for (id, amount) in needed {
        if count(map, id) < amount {
            return Err(MaintenanceError::invalid_transition(
                window_id,
                format!("maintenance count for '{}' would become negative", id),
            ));
        }
    }
    Ok(())
}

fn decrement(map: &mut HashMap<String, usize>, ids: &[String]) {
    for id in ids {
        if let Some(current) = map.get_mut(id) {
            *current -= 1;
            if *current == 0 {
                map.remove(id);
            }
        }
    }
}

impl MaintenanceCounts {
    fn switch_in_maintenance(&self, switch_id: &str) -> bool {
        count(&self.switches, switch_id) > 0
    }

    fn interface_in_maintenance(&self, topology: &dyn Topology, interface_id: &str) -> bool {
        count(&self.interfaces, interface_id) > 0
            || topology
                .interface_switch(interface_id)
                .is_some_and(|switch_id| self.switch_in_maintenance(&switch_id))
    }

    fn link_in_maintenance(&self, topology: &dyn Topology, link_id: &str) -> bool {
        count(&self.links, link_id) > 0
            || topology
                .link_endpoints(link_id)
                .is_some_and(|(a, b)| {
                    self.interface_in_maintenance(topology, &a)
                        || self.interface_in_maintenance(topology, &b)
                })
    }

    /// Device closure of `window` restricted to devices currently up:
    /// switches, their interfaces, explicit interfaces, the links of all
    /// those interfaces, and explicit links. Unknown ids are skipped.
    fn affected(&self, topology: &dyn Topology, window: &MaintenanceWindow) -> AffectedDevices {
        let switches: BTreeSet<String> = window
            .switches
            .iter()
            .filter(|id| topology.has_switch(id))
            .filter(|id| !self.switch_in_maintenance(id))
            .cloned()
            .collect();

        let implicit_interfaces = switches
            .iter()
            .flat_map(|switch_id| topology.switch_interfaces(switch_id));
        let explicit_interfaces = window
            .interfaces
            .iter()
            .filter(|id| topology.has_interface(id))
            .cloned();
        let interfaces: BTreeSet<String> = implicit_interfaces
            .chain(explicit_interfaces)
            .filter(|id| !self.interface_in_maintenance(topology, id))
            .collect();

        let implicit_links = interfaces
            .iter()
            .filter_map(|interface_id| topology.interface_link(interface_id));
        let explicit_links = window
            .links
            .iter()
            .filter(|id| topology.has_link(id))
            .cloned();
        let links: BTreeSet<String> = implicit_links
            .chain(explicit_links)
            .filter(|id| !self.link_in_maintenance(topology, id))
            .collect();

        AffectedDevices {
            switches,
            interfaces,
            links,
        }
    }
}

pub struct DeviceMaintenanceTracker {
    topology: Arc<dyn Topology>,
    events: Arc<dyn EventSink>,
    state: Arc<RwLock<MaintenanceCounts>>,
}

impl DeviceMaintenanceTracker {
    pub fn new(topology: Arc<dyn Topology>, events: Arc<dyn EventSink>) -> Self {
        Self {
            topology,
            events,
            state: Arc::new(RwLock::new(MaintenanceCounts::default())),
        }
    }

    /// Mark the window's devices as under maintenance and emit one start
    /// event listing the devices that went down because of it.
    pub async fn start_mw(&self, window: &MaintenanceWindow) -> Result<AffectedDevices> {
        let affected = {
            let mut state = self.state.write().await;
            if !state.active_windows.insert(window.id.clone()) {
                return Err(MaintenanceError::invalid_transition(
                    &window.id,
                    "maintenance already applied to devices",
                ));
            }

            let affected = state.affected(self.topology.as_ref(), window);

            increment(&mut state.switches, &window.switches);
            increment(&mut state.interfaces, &window.interfaces);
            increment(&mut state.links, &window.links);
            affected
        };

        info!(
            "Maintenance {} started: {} switches, {} interfaces, {} links down",
            window.id,
            affected.switches.len(),
            affected.interfaces.len(),
            affected.links.len()
        );
        self.emit(InterruptionKind::Start, affected.clone()).await;
        Ok(affected)
    }

    /// Release the window's devices and emit one end event listing the
    /// devices no other running window still covers.
    pub async fn end_mw(&self, window: &MaintenanceWindow) -> Result<AffectedDevices> {
        let affected = {
            let mut state = self.state.write().await;
            if !state.active_windows.contains(&window.id) {
                return Err(MaintenanceError::invalid_transition(
                    &window.id,
                    "maintenance is not applied to devices",
                ));
            }
            check_decrement(&state.switches, &window.switches, &window.id)?;
            check_decrement(&state.interfaces, &window.interfaces, &window.id)?;
            check_decrement(&state.links, &window.links, &window.id)?;

            state.active_windows.remove(&window.id);
            decrement(&mut state.switches, &window.switches);
            decrement(&mut state.interfaces, &window.interfaces);
            decrement(&mut state.links, &window.links);

            state.affected(self.topology.as_ref(), window)
        };

        info!(
            "Maintenance {} ended: {} switches, {} interfaces, {} links up",
            window.id,
            affected.switches.len(),
            affected.interfaces.len(),
            affected.links.len()
        );
        self.emit(InterruptionKind::End, affected.clone()).await;
        Ok(affected)
    }

    async fn emit(&self, kind: InterruptionKind, devices: AffectedDevices) {
        let event = InterruptionEvent::maintenance(kind, devices);
        let name = event.name.clone();
        if let Err(e) = self.events.emit(event).await {
            warn!("Failed to emit {}: {}", name, e);
        } else {
            debug!("Emitted {}", name);
        }
    }

    pub async fn is_window_active(&self, window_id: &str) -> bool {
        self.state.read().await.active_windows.contains(window_id)
    }

    #[inline]
    pub async fn switch_not_in_maintenance(&self, switch_id: &str) -> bool {
        !self.state.read().await.switch_in_maintenance(switch_id)
    }

    #[inline]
    pub async fn interface_not_in_maintenance(&self, interface_id: &str) -> bool {
        !self
            .state
            .read()
            .await
            .interface_in_maintenance(self.topology.as_ref(), interface_id)
    }

    #[inline]
    pub async fn link_not_in_maintenance(&self, link_id: &str) -> bool {
        !self
            .state
            .read()
            .await
            .link_in_maintenance(self.topology.as_ref(), link_id)
    }

    pub async fn not_in_maintenance(&self, kind: DeviceKind, device_id: &str) -> bool {
        match kind {
            DeviceKind::Switch => self.switch_not_in_maintenance(device_id).await,
            DeviceKind::Interface => self.interface_not_in_maintenance(device_id).await,
            DeviceKind::Link => self.link_not_in_maintenance(device_id).await,
        }
    }

    pub async fn status(&self, kind: DeviceKind, device_id: &str) -> EntityStatus {
        if self.not_in_maintenance(kind, device_id).await {
            EntityStatus::Up
        } else {
            EntityStatus::Down
        }
    }

    pub async fn status_reason(&self, kind: DeviceKind, device_id: &str) -> BTreeSet<String> {
        if self.not_in_maintenance(kind, device_id).await {
            BTreeSet::new()
        } else {
            BTreeSet::from([MAINTENANCE_REASON.to_string()])
        }
    }

    pub async fn switch_status(&self, switch_id: &str) -> EntityStatus {
        self.status(DeviceKind::Switch, switch_id).await
    }

    pub async fn switch_status_reason(&self, switch_id: &str) -> BTreeSet<String> {
        self.status_reason(DeviceKind::Switch, switch_id).await
    }

    pub async fn interface_status(&self, interface_id: &str) -> EntityStatus {
        self.status(DeviceKind::Interface, interface_id).await
    }

    pub async fn interface_status_reason(&self, interface_id: &str) -> BTreeSet<String> {
        self.status_reason(DeviceKind::Interface, interface_id).await
    }

    pub async fn link_status(&self, link_id: &str) -> EntityStatus {
        self.status(DeviceKind::Link, link_id).await
    }

    pub async fn link_status_reason(&self, link_id: &str) -> BTreeSet<String> {
        self.status_reason(DeviceKind::Link, link_id).await
    }

    pub async fn snapshot(&self) -> MaintenanceSnapshot {
        let state = self.state.read().await;
        MaintenanceSnapshot {
            switches: state.switches.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            interfaces: state.interfaces.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            links: state.links.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            active_windows: state.active_windows.iter().cloned().collect(),
        }
    }
}
