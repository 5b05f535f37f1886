//! Unified error taxonomy surfaced by the core.
//!
//! The teacher's per-module error enums (`FdbOrchError`, `PortsOrchError`,
//! `StpOrchError`, ...) each mingle their own subset of a status taxonomy.
//! This crate collapses all of that to a single enum: administrative calls
//! return it verbatim, data-plane calls translate it into a drop reason or a
//! counter bump and never let it unwind the pipeline.

use thiserror::Error;

/// Taxonomy of errors the core surfaces on its administrative API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Malformed input: out-of-range VLAN id, unknown port, empty name, etc.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// API called before construction completed or after shutdown.
    #[error("engine not initialized")]
    NotInitialized,

    /// VLAN, port, or MAC target missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Creating a duplicate of something that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Operation violates an invariant (delete default VLAN, disallow
    /// native VLAN, tag a port in its own access/native VLAN).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Mode mismatch, e.g. setting trunk-allowed on an access port.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// MAC Table at capacity. Surfaced on the admin path (`mac_add_static`);
    /// on the learning path this becomes a counter and a rate-limited event,
    /// never an error return.
    #[error("MAC table full")]
    TableFull,

    /// A frame failed ingress classification.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// An invariant violation discovered at runtime; should be unreachable.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
