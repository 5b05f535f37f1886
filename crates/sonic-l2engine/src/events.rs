//! Event Bus (component F): notifies subscribers of learning, aging, flush,
//! and move events so collaborators (hardware programming, telemetry) can
//! react without polling the MAC Table.
//!
//! Generalized from the teacher's `Arc<dyn Fn(...) + Send + Sync>`
//! callback-field pattern (see `ports/orch.rs`'s `PortsOrchCallbacks`) into
//! a proper subscribe/unsubscribe registry, since this crate expects an
//! arbitrary and changing number of collaborators rather than one fixed
//! owner wired in at construction.

use crate::mac_table::MacKey;
use crate::ports::PortId;
use parking_lot::RwLock;
use sonic_types::VlanId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new dynamic binding was learned.
    Learned,
    /// A known MAC moved from one port to another.
    Moved { old_port: PortId },
    /// A dynamic binding aged out.
    Aged,
    /// A dynamic binding was removed by an explicit flush.
    Flushed,
    /// The Learning Controller's per-port rate limit suppressed a learn.
    RateLimited,
    /// The MAC Table was at capacity on a learn attempt; rate-limited to one
    /// per one-second window per §4.D step 7.
    TableFull,
    /// A VLAN was created.
    VlanCreated,
    /// A VLAN was deleted.
    VlanDeleted,
    /// A port's membership or tagging within a VLAN changed.
    VlanPortChanged,
    /// A port's operational state changed.
    PortStateChanged { up: bool },
}

/// One engine event. Not every field applies to every `kind` — a VLAN event
/// carries no `MacKey`, a port-state event carries no VLAN id — so the
/// non-applicable fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub key: Option<MacKey>,
    pub port: Option<PortId>,
    pub vid: Option<VlanId>,
}

impl Event {
    /// A MAC Table event: learned, moved, refreshed, aged, flushed, rate
    /// limited, or table-full.
    pub fn mac(kind: EventKind, key: MacKey, port: Option<PortId>) -> Self {
        Self { kind, key: Some(key), port, vid: Some(key.vid) }
    }

    /// A VLAN-scoped event with no associated port (create/delete).
    pub fn vlan(kind: EventKind, vid: VlanId) -> Self {
        Self { kind, key: None, port: None, vid: Some(vid) }
    }

    /// A VLAN-and-port event (membership/tagging change on one port).
    pub fn vlan_port(kind: EventKind, vid: VlanId, port: PortId) -> Self {
        Self { kind, key: None, port: Some(port), vid: Some(vid) }
    }

    /// A port operational-state transition.
    pub fn port_state(port: PortId, up: bool) -> Self {
        Self { kind: EventKind::PortStateChanged { up }, key: None, port: Some(port), vid: None }
    }
}

/// Opaque subscription handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

type Subscriber = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    handle: Handle,
    callback: Subscriber,
}

/// Publishes engine events to registered subscribers.
///
/// The subscriber list is replaced wholesale (copy-on-write) on every
/// `subscribe`/`unsubscribe` so that `publish` only ever takes a read lock
/// and never blocks on registration churn.
pub struct EventBus {
    subscribers: RwLock<Arc<Vec<Entry>>>,
    next_handle: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Arc::new(Vec::new())),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&Event) + Send + Sync + 'static) -> Handle {
        let handle = Handle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let mut subs = self.subscribers.write();
        let mut new_list: Vec<Entry> = (**subs).clone();
        new_list.push(Entry {
            handle,
            callback: Arc::new(callback),
        });
        *subs = Arc::new(new_list);
        handle
    }

    pub fn unsubscribe(&self, handle: Handle) {
        let mut subs = self.subscribers.write();
        let new_list: Vec<Entry> = (**subs)
            .iter()
            .filter(|e| e.handle != handle)
            .cloned()
            .collect();
        *subs = Arc::new(new_list);
    }

    pub fn publish(&self, event: Event) {
        let subs = self.subscribers.read().clone();
        for entry in subs.iter() {
            (entry.callback)(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_types::MacAddress;
    use std::sync::atomic::AtomicUsize;

    fn sample_event(kind: EventKind) -> Event {
        let key = MacKey::new(MacAddress::new([0, 0, 0, 0, 0, 1]), VlanId::new(1).unwrap());
        Event::mac(kind, key, Some(PortId(0)))
    }

    #[test]
    fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        bus.subscribe(move |_ev| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(sample_event(EventKind::Learned));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let handle = bus.subscribe(move |_ev| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        bus.unsubscribe(handle);
        bus.publish(sample_event(EventKind::Learned));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn multiple_subscribers_all_fire() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = count.clone();
            bus.subscribe(move |_ev| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        bus.publish(sample_event(EventKind::Aged));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn vlan_and_port_constructors_set_expected_fields() {
        let vid = VlanId::new(10).unwrap();
        let created = Event::vlan(EventKind::VlanCreated, vid);
        assert_eq!(created.key, None);
        assert_eq!(created.port, None);
        assert_eq!(created.vid, Some(vid));

        let changed = Event::vlan_port(EventKind::VlanPortChanged, vid, PortId(2));
        assert_eq!(changed.port, Some(PortId(2)));
        assert_eq!(changed.vid, Some(vid));

        let port_up = Event::port_state(PortId(3), true);
        assert_eq!(port_up.kind, EventKind::PortStateChanged { up: true });
        assert_eq!(port_up.port, Some(PortId(3)));
        assert_eq!(port_up.vid, None);
    }
}
