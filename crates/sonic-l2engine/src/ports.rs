//! Port Registry (component A).
//!
//! Canonical set of port identifiers, validity, and the admin/oper state
//! snapshot consumed read-only by the VLAN Policy, MAC Table, Learning
//! Controller, and Forwarding Decision components.

use crate::error::{EngineError, Result};
use parking_lot::RwLock;
use sonic_orch_common::SyncMap;
use std::fmt;

/// Small integer port identifier, valid in `[0, P_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PortId(pub u16);

impl PortId {
    pub const fn new(id: u16) -> Self {
        PortId(id)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port{}", self.0)
    }
}

impl From<u16> for PortId {
    fn from(id: u16) -> Self {
        PortId(id)
    }
}

/// Snapshot of a port's administrative and operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortState {
    pub admin_up: bool,
    pub oper_up: bool,
}

impl Default for PortState {
    fn default() -> Self {
        Self {
            admin_up: false,
            oper_up: false,
        }
    }
}

/// The result of a `notify_port_state` call: whether the port transitioned
/// from up to down (the caller must flush dynamic MAC bindings on `true`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStateTransition {
    pub went_down: bool,
    pub went_up: bool,
}

struct Inner {
    ports: SyncMap<PortId, PortState>,
}

/// Tracks every known port's validity and up/down state.
///
/// Reads and writes are short critical sections under a single
/// `parking_lot::RwLock` — the registry is consulted on every ingress frame
/// but mutated only on administrative or link-state events, so the
/// reader/writer split favors the hot path.
pub struct PortRegistry {
    max_ports: usize,
    inner: RwLock<Inner>,
}

impl PortRegistry {
    pub fn new(max_ports: usize) -> Self {
        Self {
            max_ports,
            inner: RwLock::new(Inner {
                ports: SyncMap::new(),
            }),
        }
    }

    /// Registers a port with the given identifier, initially admin-down and
    /// oper-down. Fails `InvalidParameter` if `p >= P_max`, `AlreadyExists`
    /// if the port is already registered.
    pub fn register(&self, p: PortId) -> Result<()> {
        if p.0 as usize >= self.max_ports {
            return Err(EngineError::InvalidParameter(format!(
                "port {} out of range (max_ports={})",
                p, self.max_ports
            )));
        }
        let mut inner = self.inner.write();
        if inner.ports.contains_key(&p) {
            return Err(EngineError::AlreadyExists(format!("port {}", p)));
        }
        inner.ports.insert(p, PortState::default());
        Ok(())
    }

    pub fn exists(&self, p: PortId) -> bool {
        self.inner.read().ports.contains_key(&p)
    }

    pub fn admin_up(&self, p: PortId) -> Result<bool> {
        self.inner
            .read()
            .ports
            .get(&p)
            .map(|s| s.admin_up)
            .ok_or_else(|| EngineError::NotFound(format!("port {}", p)))
    }

    pub fn oper_up(&self, p: PortId) -> Result<bool> {
        self.inner
            .read()
            .ports
            .get(&p)
            .map(|s| s.oper_up)
            .ok_or_else(|| EngineError::NotFound(format!("port {}", p)))
    }

    pub fn count(&self) -> usize {
        self.inner.read().ports.len()
    }

    pub fn enumerate(&self) -> Vec<PortId> {
        let mut v: Vec<PortId> = self.inner.read().ports.keys().copied().collect();
        v.sort();
        v
    }

    pub fn set_admin_state(&self, p: PortId, up: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let state = inner
            .ports
            .get_mut(&p)
            .ok_or_else(|| EngineError::NotFound(format!("port {}", p)))?;
        state.admin_up = up;
        Ok(())
    }

    /// Records an operational state change reported by a collaborator (e.g.
    /// the hardware-simulation driver, out of scope here). Returns whether
    /// this was a down-transition so the caller can flush dynamic bindings.
    pub fn notify_port_state(&self, p: PortId, up: bool) -> Result<PortStateTransition> {
        let mut inner = self.inner.write();
        let state = inner
            .ports
            .get_mut(&p)
            .ok_or_else(|| EngineError::NotFound(format!("port {}", p)))?;
        let was_up = state.oper_up;
        state.oper_up = up;
        Ok(PortStateTransition {
            went_down: was_up && !up,
            went_up: !was_up && up,
        })
    }
}
