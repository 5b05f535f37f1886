//! Learning Controller (component D): turns an observed (source MAC, VLAN,
//! ingress port) triple from a frame into a MAC Table mutation, subject to
//! STP gating and a per-port learn-rate bound.
//!
//! Grounded in the teacher's `FdbOrch::add_entry` (`fdb/orch.rs`) for the
//! log/audit shape of an add-or-move decision; the per-port token bucket is
//! new here since the teacher has no equivalent rate limiter — SAI already
//! rate-limits learning in hardware, a guarantee this software model has to
//! reconstruct explicitly.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::error::{EngineError, Result};
use crate::events::{Event, EventBus, EventKind};
use crate::mac_table::{EntryKind, MacKey, MacTable, UpsertOutcome};
use crate::ports::{PortId, PortRegistry};
use crate::stp::StpGate;
use crate::vlan::VlanPolicy;
use crate::{audit_log, debug_log, warn_log};
use parking_lot::Mutex;
use sonic_types::{MacAddress, VlanId};
use std::collections::HashMap;

/// Per-port sliding-window counter bounding learn events to `R` per second
/// (§5). A fixed window rather than a leaky bucket: simple, and sufficient
/// since the only property that must hold is "no more than R in any
/// one-second window boundary", not smooth pacing within the window.
struct RateWindow {
    window_start: u64,
    count: u32,
}

pub struct LearningController {
    mac_table: MacTable,
    windows: Mutex<HashMap<PortId, RateWindow>>,
    learn_rate_per_port: u32,
    /// The last one-second window a `TableFull` event was published for,
    /// so repeated learn attempts against a full table emit at most one
    /// event per window rather than one per frame (§4.D step 7).
    table_full_window: Mutex<Option<u64>>,
}

/// Outcome of processing one observed (mac, vid, port) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    Learned,
    Moved { old_port: PortId },
    Refreshed,
    /// STP state or VLAN learning-disabled suppressed the learn; not an error.
    Suppressed,
    RateLimited,
    /// The MAC Table was at capacity; counted and rate-limited to one event
    /// per window rather than surfaced as a frame drop.
    TableFull,
}

impl LearningController {
    pub fn new(mac_table: MacTable, learn_rate_per_port: u32) -> Self {
        Self {
            mac_table,
            windows: Mutex::new(HashMap::new()),
            learn_rate_per_port,
            table_full_window: Mutex::new(None),
        }
    }

    pub fn mac_table(&self) -> &MacTable {
        &self.mac_table
    }

    fn rate_allows(&self, port: PortId, now: u64) -> bool {
        let mut windows = self.windows.lock();
        let w = windows.entry(port).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });
        if now != w.window_start {
            w.window_start = now;
            w.count = 0;
        }
        if w.count >= self.learn_rate_per_port {
            return false;
        }
        w.count += 1;
        true
    }

    /// The §4.D learning procedure:
    /// 1. Reject multicast/broadcast source MACs outright (caller's job via
    ///    ingress classification already excludes these as destinations,
    ///    but a malformed frame's source must still be checked here).
    /// 2. Resolve ingress VLAN (caller passes the already-classified vid).
    /// 3. Check VLAN learning is enabled.
    /// 4. Check the STP gate allows learning on this (port, vid).
    /// 5. Check the per-port rate window.
    /// 6. Upsert into the MAC Table (detects learn vs. move vs. refresh).
    /// 7. Publish an event and, on move, an audit record.
    pub fn observe(
        &self,
        src_mac: MacAddress,
        vid: VlanId,
        port: PortId,
        now: u64,
        ports: &PortRegistry,
        vlans: &VlanPolicy,
        stp: &dyn StpGate,
        events: &EventBus,
    ) -> Result<LearnOutcome> {
        if src_mac.is_multicast() {
            return Err(EngineError::InvalidFrame(
                "multicast/broadcast source address".into(),
            ));
        }
        if !ports.exists(port) {
            return Err(EngineError::NotFound(format!("port {}", port)));
        }

        if !vlans.learning_enabled(vid) {
            debug_log!("LearningController", port = %port, vid = vid.as_u16(), "learning disabled for vlan");
            return Ok(LearnOutcome::Suppressed);
        }

        if !stp.state(port, vid).allows_learning() {
            debug_log!("LearningController", port = %port, vid = vid.as_u16(), "stp state blocks learning");
            return Ok(LearnOutcome::Suppressed);
        }

        if !self.rate_allows(port, now) {
            warn_log!("LearningController", port = %port, vid = vid.as_u16(), "learn rate limit exceeded");
            let key = MacKey::new(src_mac, vid);
            events.publish(Event::mac(EventKind::RateLimited, key, Some(port)));
            return Ok(LearnOutcome::RateLimited);
        }

        let key = MacKey::new(src_mac, vid);
        match self.mac_table.upsert_dynamic(key, port, now) {
            Ok(UpsertOutcome::Learned) => {
                events.publish(Event::mac(EventKind::Learned, key, Some(port)));
                Ok(LearnOutcome::Learned)
            }
            Ok(UpsertOutcome::Refreshed) => Ok(LearnOutcome::Refreshed),
            Ok(UpsertOutcome::Moved { old_port }) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceModify,
                    "LearningController",
                    "mac_move"
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(format!("{}:{}", src_mac, vid.as_u16()))
                .with_object_type("mac_entry")
                .with_details(serde_json::json!({ "old_port": old_port.get(), "new_port": port.get() })));
                events.publish(Event::mac(EventKind::Moved { old_port }, key, Some(port)));
                Ok(LearnOutcome::Moved { old_port })
            }
            Err(EngineError::TableFull) => {
                // §4.D step 7 / §7: TableFull is counted on the learning
                // path, not raised as a frame drop, and rate-limited to one
                // warning/event per one-second window.
                let first_in_window = {
                    let mut last = self.table_full_window.lock();
                    let first = *last != Some(now);
                    *last = Some(now);
                    first
                };
                if first_in_window {
                    warn_log!("LearningController", port = %port, vid = vid.as_u16(), "mac table full");
                    audit_log!(AuditRecord::new(
                        AuditCategory::ResourceExhaustion,
                        "LearningController",
                        "mac_learn"
                    )
                    .with_error("MAC table full"));
                    events.publish(Event::mac(EventKind::TableFull, key, Some(port)));
                }
                Ok(LearnOutcome::TableFull)
            }
            Err(e) => Err(e),
        }
    }

    /// Administrative static-entry installation. Unlike `observe`, this
    /// bypasses STP gating and the rate window; it fails on a full table
    /// rather than silently suppressing.
    pub fn add_static(&self, mac: MacAddress, vid: VlanId, port: PortId, now: u64) -> Result<()> {
        let key = MacKey::new(mac, vid);
        self.mac_table.insert_fixed(key, port, EntryKind::Static, now)?;
        audit_log!(AuditRecord::new(AuditCategory::ResourceCreate, "LearningController", "mac_add_static")
            .with_outcome(AuditOutcome::Success)
            .with_object_id(format!("{}:{}", mac, vid.as_u16()))
            .with_object_type("mac_entry"));
        Ok(())
    }

    pub fn delete(&self, mac: MacAddress, vid: VlanId) -> Result<()> {
        let key = MacKey::new(mac, vid);
        self.mac_table.delete(&key)?;
        audit_log!(AuditRecord::new(AuditCategory::ResourceDelete, "LearningController", "mac_delete")
            .with_outcome(AuditOutcome::Success)
            .with_object_id(format!("{}:{}", mac, vid.as_u16()))
            .with_object_type("mac_entry"));
        Ok(())
    }

    /// Flushes entries matching `filter` (Static/Management entries survive
    /// unless `filter.include_static` is set), publishing a `Flushed` event
    /// per removed key so collaborators can react without rescanning the
    /// whole table.
    pub fn flush(&self, filter: crate::mac_table::FlushFilter, events: &EventBus) -> usize {
        let before = self.mac_table.all_entries();
        let removed = self.mac_table.flush(filter);
        if removed > 0 {
            for (key, entry) in before {
                if filter.matches(&key, &entry) {
                    events.publish(Event::mac(EventKind::Flushed, key, Some(entry.port)));
                }
            }
        }
        removed
    }

    /// Ages out dynamic bindings older than the configured threshold,
    /// publishing an `Aged` event per removed key.
    pub fn age(&self, now: u64, threshold_secs: u64, events: &EventBus) -> usize {
        let aged = self.mac_table.age_out(now, threshold_secs);
        for key in &aged {
            events.publish(Event::mac(EventKind::Aged, *key, None));
        }
        aged.len()
    }
}
