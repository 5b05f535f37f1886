//! Common SONiC types for network switch orchestration.
//!
//! This crate provides type-safe representations of common network primitives
//! used throughout the SONiC control plane:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`PortType`]: Switch port classifications
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers

mod mac;
mod port;
mod vlan;

pub use mac::MacAddress;
pub use port::{AdminState, OperState, PortRole, PortType};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid port type: {0}")]
    InvalidPortType(String),
}
