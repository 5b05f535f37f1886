//! MAC Table data model (§3: MAC/FDB entry, flush filters).

use crate::ports::PortId;
use sonic_types::{MacAddress, VlanId};

/// Composite key a MAC entry is stored under: a MAC is scoped per VLAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacKey {
    pub mac: MacAddress,
    pub vid: VlanId,
}

impl MacKey {
    pub fn new(mac: MacAddress, vid: VlanId) -> Self {
        Self { mac, vid }
    }
}

/// How an entry was installed, mirroring the teacher's `FdbType` split
/// between dynamically learned and statically configured bindings, plus a
/// `Management` tier for entries the control plane installs for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Learned from ingress traffic; subject to aging and port-down flush.
    Dynamic,
    /// Installed by administrative action; immune to aging and flush.
    Static,
    /// Reserved for entries the engine itself maintains (e.g. CPU-bound
    /// protocol MACs); immune to aging and flush, like `Static`.
    Management,
}

impl EntryKind {
    pub fn ages(self) -> bool {
        matches!(self, EntryKind::Dynamic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacEntry {
    pub port: PortId,
    pub kind: EntryKind,
    /// Seconds since an epoch fixed at table construction; monotonic within
    /// one table's lifetime, used only for aging comparisons.
    pub last_seen: u64,
}

impl MacEntry {
    pub fn new(port: PortId, kind: EntryKind, now: u64) -> Self {
        Self {
            port,
            kind,
            last_seen: now,
        }
    }
}

/// Which entries a flush's scope selects, independent of entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
    /// Every entry bound to this port, any VLAN.
    Port(PortId),
    /// Every entry within this VLAN, any port.
    Vlan(VlanId),
    /// Every entry bound to this (port, VLAN) pair.
    PortVlan(PortId, VlanId),
    /// Every entry in the table.
    All,
}

/// Selects which entries a flush removes: a scope plus whether Static and
/// Management entries within that scope are included. By default only
/// Dynamic entries are removed, per §4.C ("Static and Management entries
/// survive unless `include_static` is set").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushFilter {
    pub scope: FlushScope,
    pub include_static: bool,
}

impl FlushFilter {
    pub fn port(p: PortId) -> Self {
        Self { scope: FlushScope::Port(p), include_static: false }
    }

    pub fn vlan(v: VlanId) -> Self {
        Self { scope: FlushScope::Vlan(v), include_static: false }
    }

    pub fn port_vlan(p: PortId, v: VlanId) -> Self {
        Self { scope: FlushScope::PortVlan(p, v), include_static: false }
    }

    pub fn all() -> Self {
        Self { scope: FlushScope::All, include_static: false }
    }

    /// Extends this filter to also remove Static/Management entries in scope.
    pub fn including_static(mut self) -> Self {
        self.include_static = true;
        self
    }

    pub fn matches(&self, key: &MacKey, entry: &MacEntry) -> bool {
        let in_scope = match self.scope {
            FlushScope::Port(p) => entry.port == p,
            FlushScope::Vlan(v) => key.vid == v,
            FlushScope::PortVlan(p, v) => entry.port == p && key.vid == v,
            FlushScope::All => true,
        };
        in_scope && (self.include_static || entry.kind.ages())
    }
}
