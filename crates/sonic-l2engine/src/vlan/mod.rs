//! VLAN Policy (component B): membership, tagging, ingress classification,
//! egress decision, flood-set computation.

mod policy;
mod types;

pub use policy::VlanPolicy;
pub use types::{DropReason, EgressDecision, PortMode, PortVlanConfig, VlanRecord};
