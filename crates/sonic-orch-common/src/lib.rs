//! Common orchestration infrastructure for SONiC.
//!
//! - [`SyncMap`]: Type-safe map that prevents auto-vivification bugs.

mod sync_map;

pub use sync_map::{HasRefCount, SyncMap, SyncMapError};
