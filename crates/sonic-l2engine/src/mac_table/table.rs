//! Sharded MAC Table (component C).
//!
//! Keyed by `(MacAddress, VlanId)` and bucketed across independent
//! `parking_lot::RwLock`-guarded shards, the way the teacher's FDB shards
//! its SAI object cache by port to keep lock contention local to a bucket
//! rather than global to the table. Shard count is fixed at construction
//! (`EngineConfig::mac_table_shards`); `max_mac_entries` bounds total
//! occupancy across all shards.

use super::types::{EntryKind, FlushFilter, MacEntry, MacKey};
use crate::error::{EngineError, Result};
use crate::ports::PortId;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Result of a learning-path upsert, distinguishing a brand-new binding
/// from a MAC moving ports from a plain refresh of its existing binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Learned,
    Moved { old_port: PortId },
    Refreshed,
}

struct Shard {
    entries: RwLock<HashMap<MacKey, MacEntry>>,
}

pub struct MacTable {
    shards: Vec<Shard>,
    capacity: usize,
}

impl MacTable {
    pub fn new(capacity: usize, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Shard {
                entries: RwLock::new(HashMap::new()),
            })
            .collect();
        Self { shards, capacity }
    }

    fn shard_index(&self, key: &MacKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    fn shard(&self, key: &MacKey) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.entries.read().len()).sum()
    }

    /// Total entries across every shard except `excluded`. Used while a
    /// write lock on `excluded` is already held, since `RwLock` is not
    /// reentrant and `len()` would deadlock against it.
    fn len_excluding(&self, excluded: usize) -> usize {
        self.shards
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != excluded)
            .map(|(_, s)| s.entries.read().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &MacKey) -> Option<MacEntry> {
        self.shard(key).entries.read().get(key).copied()
    }

    pub fn contains(&self, key: &MacKey) -> bool {
        self.shard(key).entries.read().contains_key(key)
    }

    /// Learning-path upsert (§4.C / §4.D step 7). `TableFull` is only
    /// possible for genuinely new keys — refreshing or moving an existing
    /// key never fails on capacity.
    pub fn upsert_dynamic(&self, key: MacKey, port: PortId, now: u64) -> Result<UpsertOutcome> {
        let shard_idx = self.shard_index(&key);
        let mut entries = self.shards[shard_idx].entries.write();

        if let Some(existing) = entries.get_mut(&key) {
            if existing.port == port {
                existing.last_seen = now;
                return Ok(UpsertOutcome::Refreshed);
            }
            // Static/Management entries are never overwritten by learning
            // (§4.C/§4.E: a Static entry is never overwritten by learning).
            // Traffic for the key on a different port still refreshes
            // last_seen but leaves the administratively-installed binding
            // in place rather than registering a move.
            if !existing.kind.ages() {
                existing.last_seen = now;
                return Ok(UpsertOutcome::Refreshed);
            }
            let old_port = existing.port;
            existing.port = port;
            existing.kind = EntryKind::Dynamic;
            existing.last_seen = now;
            return Ok(UpsertOutcome::Moved { old_port });
        }

        if entries.len() + self.len_excluding(shard_idx) >= self.capacity {
            return Err(EngineError::TableFull);
        }
        entries.insert(key, MacEntry::new(port, EntryKind::Dynamic, now));
        Ok(UpsertOutcome::Learned)
    }

    /// Administrative insert of a static or management entry. Overwrites any
    /// existing entry for the key (including a dynamic one) unconditionally.
    pub fn insert_fixed(&self, key: MacKey, port: PortId, kind: EntryKind, now: u64) -> Result<()> {
        debug_assert!(!kind.ages());
        let shard_idx = self.shard_index(&key);
        let mut entries = self.shards[shard_idx].entries.write();
        if !entries.contains_key(&key) && entries.len() + self.len_excluding(shard_idx) >= self.capacity {
            return Err(EngineError::TableFull);
        }
        entries.insert(key, MacEntry::new(port, kind, now));
        Ok(())
    }

    pub fn delete(&self, key: &MacKey) -> Result<()> {
        let shard = self.shard(key);
        let mut entries = shard.entries.write();
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("mac {} vlan {}", key.mac, key.vid.as_u16())))
    }

    /// Removes every entry matching `filter`'s scope and kind (Static and
    /// Management entries survive unless `filter.include_static` is set).
    /// Returns the count removed.
    pub fn flush(&self, filter: FlushFilter) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut entries = shard.entries.write();
            let before = entries.len();
            entries.retain(|key, entry| !filter.matches(key, entry));
            removed += before - entries.len();
        }
        removed
    }

    /// Removes every dynamic entry whose `last_seen` is older than
    /// `now - threshold_secs`. Returns the keys removed so the caller (the
    /// Learning Controller) can emit aged events.
    pub fn age_out(&self, now: u64, threshold_secs: u64) -> Vec<MacKey> {
        let mut aged = Vec::new();
        for shard in &self.shards {
            let mut entries = shard.entries.write();
            entries.retain(|key, entry| {
                let expired = entry.kind.ages() && now.saturating_sub(entry.last_seen) >= threshold_secs;
                if expired {
                    aged.push(*key);
                }
                !expired
            });
        }
        aged
    }

    pub fn entries_for_port(&self, port: PortId) -> Vec<MacKey> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let entries = shard.entries.read();
            out.extend(entries.iter().filter(|(_, e)| e.port == port).map(|(k, _)| *k));
        }
        out
    }

    pub fn all_entries(&self) -> Vec<(MacKey, MacEntry)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            out.extend(shard.entries.read().iter().map(|(k, v)| (*k, *v)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_types::VlanId;

    fn key(mac_last: u8, vid: u16) -> MacKey {
        let mac = sonic_types::MacAddress::new([0, 0, 0, 0, 0, mac_last]);
        MacKey::new(mac, VlanId::new(vid).unwrap())
    }

    #[test]
    fn learn_then_refresh() {
        let t = MacTable::new(16, 4);
        let k = key(1, 10);
        assert_eq!(t.upsert_dynamic(k, PortId(0), 0).unwrap(), UpsertOutcome::Learned);
        assert_eq!(t.upsert_dynamic(k, PortId(0), 5).unwrap(), UpsertOutcome::Refreshed);
        assert_eq!(t.get(&k).unwrap().last_seen, 5);
    }

    #[test]
    fn move_detection() {
        let t = MacTable::new(16, 4);
        let k = key(1, 10);
        t.upsert_dynamic(k, PortId(0), 0).unwrap();
        let outcome = t.upsert_dynamic(k, PortId(1), 1).unwrap();
        assert_eq!(outcome, UpsertOutcome::Moved { old_port: PortId(0) });
        assert_eq!(t.get(&k).unwrap().port, PortId(1));
    }

    #[test]
    fn table_full_on_new_key_only() {
        let t = MacTable::new(1, 1);
        t.upsert_dynamic(key(1, 10), PortId(0), 0).unwrap();
        // refreshing the existing key must not fail even at capacity
        t.upsert_dynamic(key(1, 10), PortId(0), 1).unwrap();
        assert!(matches!(
            t.upsert_dynamic(key(2, 10), PortId(0), 0),
            Err(EngineError::TableFull)
        ));
    }

    #[test]
    fn static_entries_survive_flush_and_age() {
        let t = MacTable::new(16, 4);
        let static_key = key(1, 10);
        let dyn_key = key(2, 10);
        t.insert_fixed(static_key, PortId(0), EntryKind::Static, 0).unwrap();
        t.upsert_dynamic(dyn_key, PortId(1), 0).unwrap();

        let removed = t.flush(FlushFilter::all());
        assert_eq!(removed, 1);
        assert!(t.contains(&static_key));
        assert!(!t.contains(&dyn_key));
    }

    #[test]
    fn include_static_removes_static_entries_too() {
        let t = MacTable::new(16, 4);
        let static_key = key(1, 10);
        let dyn_key = key(2, 10);
        t.insert_fixed(static_key, PortId(0), EntryKind::Static, 0).unwrap();
        t.upsert_dynamic(dyn_key, PortId(1), 0).unwrap();

        let removed = t.flush(FlushFilter::all().including_static());
        assert_eq!(removed, 2);
        assert!(!t.contains(&static_key));
        assert!(!t.contains(&dyn_key));
    }

    #[test]
    fn static_entry_immune_to_move_by_learning() {
        let t = MacTable::new(16, 4);
        let k = key(1, 10);
        t.insert_fixed(k, PortId(0), EntryKind::Static, 0).unwrap();

        let outcome = t.upsert_dynamic(k, PortId(1), 5).unwrap();
        assert_eq!(outcome, UpsertOutcome::Refreshed);

        let entry = t.get(&k).unwrap();
        assert_eq!(entry.port, PortId(0));
        assert_eq!(entry.kind, EntryKind::Static);
        assert_eq!(entry.last_seen, 5);
    }

    #[test]
    fn age_out_removes_only_expired_dynamic() {
        let t = MacTable::new(16, 4);
        let old = key(1, 10);
        let fresh = key(2, 10);
        t.upsert_dynamic(old, PortId(0), 0).unwrap();
        t.upsert_dynamic(fresh, PortId(0), 290).unwrap();

        let aged = t.age_out(300, 300);
        assert_eq!(aged, vec![old]);
        assert!(!t.contains(&old));
        assert!(t.contains(&fresh));
    }

    #[test]
    fn flush_by_port_and_vlan() {
        let t = MacTable::new(16, 4);
        t.upsert_dynamic(key(1, 10), PortId(0), 0).unwrap();
        t.upsert_dynamic(key(2, 20), PortId(0), 0).unwrap();
        t.upsert_dynamic(key(3, 10), PortId(1), 0).unwrap();

        let removed = t.flush(FlushFilter::port_vlan(PortId(0), VlanId::new(10).unwrap()));
        assert_eq!(removed, 1);
        assert!(!t.contains(&key(1, 10)));
        assert!(t.contains(&key(2, 20)));
        assert!(t.contains(&key(3, 10)));
    }
}
