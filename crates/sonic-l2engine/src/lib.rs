//! L2 forwarding engine: MAC learning, VLAN membership/tagging, and the
//! forwarding decision they feed, wired together behind a single [`Engine`]
//! facade.
//!
//! Consumes a [`ports::PortRegistry`] and an [`stp::StpGate`] as inputs it
//! does not own; everything else (VLAN Policy, MAC Table, Learning
//! Controller, Forwarding Decision, Event Bus) lives here.

pub mod audit;
pub mod bitset;
pub mod config;
pub mod error;
pub mod events;
pub mod forwarding;
pub mod learning;
pub mod mac_table;
pub mod ports;
pub mod stp;
pub mod vlan;

pub use config::EngineConfig;
pub use error::{EngineError, Result};

use events::{Event, EventBus, Handle};
use forwarding::{decide, Frame, ForwardingAction};
use learning::{LearnOutcome, LearningController};
use mac_table::{FlushFilter, MacEntry, MacKey, MacTable};
use ports::{PortId, PortRegistry, PortStateTransition};
use sonic_types::{MacAddress, VlanId};
use std::sync::Arc;
use stp::{AllForwarding, StpGate};
use vlan::{PortVlanConfig, VlanPolicy, VlanRecord};

/// The engine facade: the one type embedders construct and drive. Owns the
/// VLAN Policy, MAC Table (via the Learning Controller), and Event Bus;
/// borrows a Port Registry and STP gate supplied at construction.
pub struct Engine {
    config: EngineConfig,
    ports: Arc<PortRegistry>,
    vlans: VlanPolicy,
    learning: LearningController,
    events: EventBus,
    stp: Arc<dyn StpGate>,
}

impl Engine {
    /// Builds a fresh engine. `ports` and `stp` are shared with whatever
    /// collaborator owns port discovery and spanning tree; pass
    /// `Arc::new(stp::AllForwarding)` when no spanning-tree collaborator is
    /// wired in yet.
    pub fn new(config: EngineConfig, ports: Arc<PortRegistry>, stp: Arc<dyn StpGate>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            vlans: VlanPolicy::new(config.max_ports),
            learning: LearningController::new(
                MacTable::new(config.max_mac_entries, config.mac_table_shards),
                config.learn_rate_per_port,
            ),
            events: EventBus::new(),
            ports,
            stp,
            config,
        })
    }

    /// Convenience constructor for an engine with no spanning-tree
    /// collaborator: every port forwards on every VLAN.
    pub fn new_without_stp(config: EngineConfig, ports: Arc<PortRegistry>) -> Result<Self> {
        Self::new(config, ports, Arc::new(AllForwarding))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    pub fn vlans(&self) -> &VlanPolicy {
        &self.vlans
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // --------------------------------------------------------- learning

    /// Processes one observed (source MAC, VLAN, ingress port) triple.
    pub fn observe(&self, src_mac: MacAddress, vid: VlanId, port: PortId, now: u64) -> Result<LearnOutcome> {
        self.learning
            .observe(src_mac, vid, port, now, &self.ports, &self.vlans, self.stp.as_ref(), &self.events)
    }

    pub fn mac_add_static(&self, mac: MacAddress, vid: VlanId, port: PortId, now: u64) -> Result<()> {
        self.learning.add_static(mac, vid, port, now)
    }

    pub fn mac_delete(&self, mac: MacAddress, vid: VlanId) -> Result<()> {
        self.learning.delete(mac, vid)
    }

    pub fn mac_get(&self, mac: MacAddress, vid: VlanId) -> Option<MacEntry> {
        self.learning.mac_table().get(&MacKey::new(mac, vid))
    }

    pub fn mac_flush(&self, filter: FlushFilter) -> usize {
        self.learning.flush(filter, &self.events)
    }

    /// Ages out dynamic bindings older than `EngineConfig::aging_threshold_secs`.
    /// Callers drive the clock; the engine has no background timer of its own.
    pub fn mac_age(&self, now: u64) -> usize {
        self.learning.age(now, self.config.aging_threshold_secs, &self.events)
    }

    pub fn mac_count(&self) -> usize {
        self.learning.mac_table().len()
    }

    /// Flushes every dynamic binding on a port whose link just went down.
    /// Embedders should call this after `ports().notify_port_state` reports
    /// `went_down`.
    pub fn on_port_state_change(&self, port: PortId, transition: PortStateTransition) -> usize {
        if transition.went_down {
            self.learning.flush(FlushFilter::port(port), &self.events)
        } else {
            0
        }
    }

    /// Reports an operational link-state change and flushes the port's
    /// dynamic bindings on a down-transition in one call.
    pub fn notify_port_state(&self, port: PortId, up: bool) -> Result<PortStateTransition> {
        let transition = self.ports.notify_port_state(port, up)?;
        self.events.publish(Event::port_state(port, up));
        self.on_port_state_change(port, transition);
        Ok(transition)
    }

    /// Drives the aging clock. Embedders call this periodically (e.g. once
    /// a second) with a monotonically increasing `now_seconds`; the engine
    /// keeps no timer of its own.
    pub fn tick(&self, now_seconds: u64) -> usize {
        self.mac_age(now_seconds)
    }

    // ------------------------------------------------------------- vlan

    pub fn vlan_create(&self, vid: VlanId, name: Option<String>) -> Result<()> {
        self.vlans.create(vid, name, &self.events)
    }

    pub fn vlan_delete(&self, vid: VlanId) -> Result<()> {
        self.vlans.delete(vid, &self.events)
    }

    pub fn vlan_get(&self, vid: VlanId) -> Result<VlanRecord> {
        self.vlans.vlan_get(vid)
    }

    pub fn vlan_get_all(&self) -> Vec<(u16, VlanRecord)> {
        self.vlans.vlan_get_all()
    }

    pub fn port_set_access(&self, port: PortId, vid: VlanId) -> Result<()> {
        self.vlans.set_mode_access(port, vid)
    }

    pub fn port_set_trunk(&self, port: PortId, native: Option<VlanId>) -> Result<()> {
        self.vlans.set_mode_trunk(port, native)
    }

    pub fn port_set_hybrid(&self, port: PortId, native: Option<VlanId>) -> Result<()> {
        self.vlans.set_mode_hybrid(port, native)
    }

    pub fn port_get_vlan_config(&self, port: PortId) -> Result<PortVlanConfig> {
        self.vlans.port_get_config(port)
    }

    pub fn vlan_add_port(&self, vid: VlanId, port: PortId, tagged: bool) -> Result<()> {
        self.vlans.add_port(vid, port, tagged, &self.events)
    }

    pub fn vlan_remove_port(&self, vid: VlanId, port: PortId) -> Result<()> {
        self.vlans.remove_port(vid, port, &self.events)
    }

    pub fn vlan_set_tagging(&self, port: PortId, vid: VlanId, tagged: bool) -> Result<()> {
        self.vlans.set_tagging(port, vid, tagged, &self.events)
    }

    pub fn vlan_set_trunk_allowed(&self, port: PortId, vid: VlanId, allowed: bool) -> Result<()> {
        self.vlans.set_trunk_allowed(port, vid, allowed, &self.events)
    }

    // ------------------------------------------------------------ events

    pub fn subscribe(&self, callback: impl Fn(&Event) + Send + Sync + 'static) -> Handle {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&self, handle: Handle) {
        self.events.unsubscribe(handle)
    }

    // -------------------------------------------------------- data plane

    /// Full forwarding decision for one frame, given its ingress port,
    /// optional 802.1Q tag, and destination MAC.
    pub fn forward(&self, ingress_port: PortId, tag_vid: Option<u16>, dst_mac: MacAddress) -> ForwardingAction {
        let frame = Frame {
            ingress_port,
            tag_vid,
            dst_mac,
        };
        decide(&frame, &self.vlans, self.learning.mac_table(), &self.ports, self.stp.as_ref())
    }
}
