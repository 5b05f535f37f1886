//! Forwarding Decision (component E): given an ingress frame, decides
//! whether to drop it, unicast it to a single egress port, or flood it,
//! consulting the VLAN Policy, MAC Table, Port Registry, and STP gate but
//! owning no state of its own.

use crate::mac_table::{MacKey, MacTable};
use crate::ports::PortId;
use crate::stp::StpGate;
use crate::vlan::{DropReason, EgressDecision, VlanPolicy};
use sonic_types::{MacAddress, VlanId};

/// Per-destination-port tag instruction for an egress copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOp {
    Untagged,
    Tagged(VlanId),
}

/// The decided action for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardingAction {
    Drop(DropReason),
    /// Blocked by spanning tree on the resolved VLAN/port, not a VLAN
    /// membership or tagging violation.
    StpBlocked,
    Unicast { port: PortId, tag: TagOp },
    Flood { ports: Vec<(PortId, TagOp)> },
}

/// A frame description sufficient to make a forwarding decision: the
/// ingress port, the optional 802.1Q tag carried, and source/destination
/// MACs (source is only consulted to special-case a destination equal to
/// source, which can never happen on a real frame but is cheap to guard).
pub struct Frame {
    pub ingress_port: PortId,
    pub tag_vid: Option<u16>,
    pub dst_mac: MacAddress,
}

/// Pure decision function: classifies ingress, looks up the destination,
/// and resolves an egress plan. Never mutates the MAC Table or VLAN Policy.
pub fn decide(
    frame: &Frame,
    vlans: &VlanPolicy,
    mac_table: &MacTable,
    ports: &crate::ports::PortRegistry,
    stp: &dyn StpGate,
) -> ForwardingAction {
    let vid = match vlans.classify_ingress(frame.ingress_port, frame.tag_vid) {
        Ok(v) => v,
        Err(reason) => return ForwardingAction::Drop(reason),
    };

    if !stp.state(frame.ingress_port, vid).allows_forwarding() {
        return ForwardingAction::StpBlocked;
    }

    if frame.dst_mac.is_multicast() {
        return flood(vid, frame.ingress_port, vlans, ports, stp);
    }

    let key = MacKey::new(frame.dst_mac, vid);
    match mac_table.get(&key) {
        Some(entry) => {
            if !stp.state(entry.port, vid).allows_forwarding() {
                return ForwardingAction::StpBlocked;
            }
            match vlans.egress_decision(entry.port, vid) {
                EgressDecision::Drop => ForwardingAction::Drop(DropReason::NotMember),
                EgressDecision::Untagged => ForwardingAction::Unicast {
                    port: entry.port,
                    tag: TagOp::Untagged,
                },
                EgressDecision::Tagged(v) => ForwardingAction::Unicast {
                    port: entry.port,
                    tag: TagOp::Tagged(v),
                },
            }
        }
        None => flood(vid, frame.ingress_port, vlans, ports, stp),
    }
}

fn flood(
    vid: VlanId,
    ingress_port: PortId,
    vlans: &VlanPolicy,
    ports: &crate::ports::PortRegistry,
    stp: &dyn StpGate,
) -> ForwardingAction {
    let candidates = vlans.flood_set(vid, ingress_port, ports);
    let mut plan = Vec::with_capacity(candidates.len());
    for p in candidates {
        if !stp.state(p, vid).allows_forwarding() {
            continue;
        }
        match vlans.egress_decision(p, vid) {
            EgressDecision::Drop => {}
            EgressDecision::Untagged => plan.push((p, TagOp::Untagged)),
            EgressDecision::Tagged(v) => plan.push((p, TagOp::Tagged(v))),
        }
    }
    ForwardingAction::Flood { ports: plan }
}
