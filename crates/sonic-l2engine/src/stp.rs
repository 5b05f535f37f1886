//! STP gate: the per-(port, VLAN) spanning-tree state consumed, not owned,
//! by the Learning Controller and Forwarding Decision components.
//!
//! The state values and their names are carried over from the teacher's
//! `StpState`; what's new here is the [`StpGate`] trait boundary, since this
//! crate does not run spanning tree itself — it consults whatever state a
//! collaborator (the STP protocol engine, out of scope here) reports.

use crate::ports::PortId;
use sonic_types::VlanId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StpState {
    Disabled = 0,
    Blocking = 1,
    Listening = 2,
    Learning = 3,
    Forwarding = 4,
}

impl StpState {
    /// Whether a frame may be *learned* from in this state.
    pub fn allows_learning(self) -> bool {
        matches!(self, StpState::Learning | StpState::Forwarding)
    }

    /// Whether a frame may be *forwarded* in this state.
    pub fn allows_forwarding(self) -> bool {
        matches!(self, StpState::Forwarding)
    }
}

/// Per-(port, VLAN) spanning-tree state lookup.
///
/// Implemented by whatever owns the spanning-tree protocol state machine;
/// the engine only ever reads through this trait.
pub trait StpGate: Send + Sync {
    fn state(&self, port: PortId, vid: VlanId) -> StpState;
}

/// A `StpGate` that reports every port forwarding on every VLAN — the
/// default when no spanning-tree collaborator is wired in, and a convenient
/// fixture for tests that don't exercise STP gating directly.
#[derive(Debug, Default)]
pub struct AllForwarding;

impl StpGate for AllForwarding {
    fn state(&self, _port: PortId, _vid: VlanId) -> StpState {
        StpState::Forwarding
    }
}

/// A simple in-memory `StpGate` backed by an explicit table, for tests and
/// for embedders who drive STP state from their own poller rather than a
/// push feed.
#[derive(Debug, Default)]
pub struct StaticStpGate {
    states: parking_lot::RwLock<HashMap<(PortId, VlanId), StpState>>,
}

impl StaticStpGate {
    pub fn new() -> Self {
        Self {
            states: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, port: PortId, vid: VlanId, state: StpState) {
        self.states.write().insert((port, vid), state);
    }
}

impl StpGate for StaticStpGate {
    fn state(&self, port: PortId, vid: VlanId) -> StpState {
        self.states
            .read()
            .get(&(port, vid))
            .copied()
            .unwrap_or(StpState::Forwarding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_forwarding_always_forwards() {
        let gate = AllForwarding;
        assert_eq!(
            gate.state(PortId(0), VlanId::new(1).unwrap()),
            StpState::Forwarding
        );
    }

    #[test]
    fn static_gate_defaults_then_overrides() {
        let gate = StaticStpGate::new();
        let vid = VlanId::new(10).unwrap();
        assert_eq!(gate.state(PortId(0), vid), StpState::Forwarding);
        gate.set(PortId(0), vid, StpState::Blocking);
        assert_eq!(gate.state(PortId(0), vid), StpState::Blocking);
        assert!(!StpState::Blocking.allows_forwarding());
        assert!(!StpState::Blocking.allows_learning());
    }
}
