//! VLAN Policy data model (§3: VLAN record, Port VLAN config).

use crate::bitset::Bitset;
use crate::ports::PortId;
use sonic_types::VlanId;
use std::collections::HashSet;

/// A port's mode of participation in VLANs, mirroring the teacher's
/// `VlanTaggingMode` split but applied at the port level rather than the
/// per-membership level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortMode {
    Access,
    Trunk,
    Hybrid,
}

/// Why a frame was dropped during ingress classification or egress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Tagged frame arrived on an access port, or on a port that does not
    /// accept tagged frames.
    InvalidTag,
    /// The tag's VLAN id does not name an active VLAN.
    UnknownVlan,
    /// The ingress or egress port is not a member of the resolved VLAN.
    NotMember,
    /// VLAN is not in the trunk/hybrid port's allowed set.
    NotAllowed,
    /// Untagged frame arrived on a port that does not accept untagged frames.
    UntaggedRejected,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DropReason::InvalidTag => "invalid_tag",
            DropReason::UnknownVlan => "unknown_vlan",
            DropReason::NotMember => "not_member",
            DropReason::NotAllowed => "not_allowed",
            DropReason::UntaggedRejected => "untagged_rejected",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of the egress rule for a single (port, vid) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EgressDecision {
    Drop,
    Untagged,
    Tagged(VlanId),
}

/// One active VLAN's membership and policy flags.
#[derive(Debug, Clone)]
pub struct VlanRecord {
    pub name: String,
    pub members: Bitset,
    pub untagged: Bitset,
    pub active: bool,
    pub learning_enabled: bool,
    pub stp_enabled: bool,
}

impl VlanRecord {
    pub fn new(name: impl Into<String>, max_ports: usize) -> Self {
        Self {
            name: name.into(),
            members: Bitset::with_capacity(max_ports),
            untagged: Bitset::with_capacity(max_ports),
            active: true,
            learning_enabled: true,
            stp_enabled: true,
        }
    }

    pub fn has_member(&self, p: PortId) -> bool {
        self.members.contains(p.get() as usize)
    }

    pub fn is_untagged(&self, p: PortId) -> bool {
        self.untagged.contains(p.get() as usize)
    }
}

/// One port's VLAN participation configuration.
#[derive(Debug, Clone)]
pub struct PortVlanConfig {
    pub mode: PortMode,
    /// Present when `mode == Access`.
    pub pvid: Option<VlanId>,
    /// Present when `mode` is `Trunk`/`Hybrid`.
    pub native: Option<VlanId>,
    /// VLANs permitted on a Trunk/Hybrid port (native is always a member).
    pub allowed: HashSet<VlanId>,
    pub accept_untagged: bool,
    pub accept_tagged: bool,
    pub ingress_filter: bool,
}

impl PortVlanConfig {
    pub fn access(pvid: VlanId) -> Self {
        Self {
            mode: PortMode::Access,
            pvid: Some(pvid),
            native: None,
            allowed: HashSet::new(),
            accept_untagged: true,
            accept_tagged: false,
            ingress_filter: true,
        }
    }

    pub fn trunk(native: Option<VlanId>) -> Self {
        let mut allowed = HashSet::new();
        if let Some(n) = native {
            allowed.insert(n);
        }
        Self {
            mode: PortMode::Trunk,
            pvid: None,
            native,
            allowed,
            accept_untagged: native.is_some(),
            accept_tagged: true,
            ingress_filter: true,
        }
    }

    pub fn hybrid(native: Option<VlanId>) -> Self {
        let mut cfg = Self::trunk(native);
        cfg.mode = PortMode::Hybrid;
        cfg
    }
}
