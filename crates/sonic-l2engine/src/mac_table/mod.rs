//! MAC Table (component C): sharded dynamic/static bindings, aging, flush.

mod table;
mod types;

pub use table::{MacTable, UpsertOutcome};
pub use types::{EntryKind, FlushFilter, FlushScope, MacEntry, MacKey};
