//! VLAN Policy (component B): membership, tagging, ingress classification,
//! egress decision, and flood-set computation.
//!
//! Guarded by a single logical reader-writer lock per §5 — ingress
//! classification and egress decisions take it as reader, administrative
//! mutations take it as writer. Readers see an internally consistent
//! snapshot; there is never a torn view of `members`/`untagged` within one
//! VLAN record.

use super::types::{DropReason, EgressDecision, PortMode, PortVlanConfig, VlanRecord};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::error::{EngineError, Result};
use crate::events::{Event, EventBus, EventKind};
use crate::ports::{PortId, PortRegistry};
use crate::{audit_log, info_log};
use parking_lot::RwLock;
use sonic_orch_common::SyncMap;
use sonic_types::VlanId;

const DEFAULT_VLAN: u16 = 1;

struct Inner {
    vlans: SyncMap<u16, VlanRecord>,
    ports: SyncMap<PortId, PortVlanConfig>,
}

pub struct VlanPolicy {
    max_ports: usize,
    inner: RwLock<Inner>,
}

impl VlanPolicy {
    /// Builds a fresh policy table with VLAN 1 present and active, per the
    /// §3 invariant that the default VLAN always exists.
    pub fn new(max_ports: usize) -> Self {
        let mut vlans = SyncMap::new();
        vlans.insert(DEFAULT_VLAN, VlanRecord::new("default", max_ports));
        Self {
            max_ports,
            inner: RwLock::new(Inner {
                vlans,
                ports: SyncMap::new(),
            }),
        }
    }

    fn default_vlan_id() -> VlanId {
        VlanId::new(DEFAULT_VLAN).expect("VLAN 1 is always valid")
    }

    // ---------------------------------------------------------------- admin

    pub fn create(&self, vid: VlanId, name: Option<String>, events: &EventBus) -> Result<()> {
        let mut inner = self.inner.write();
        if inner
            .vlans
            .get(&vid.as_u16())
            .map(|v| v.active)
            .unwrap_or(false)
        {
            return Err(EngineError::AlreadyExists(format!("vlan {}", vid.as_u16())));
        }
        let name = name.unwrap_or_else(|| format!("Vlan{}", vid.as_u16()));
        inner
            .vlans
            .insert(vid.as_u16(), VlanRecord::new(name, self.max_ports));
        drop(inner);
        events.publish(Event::vlan(EventKind::VlanCreated, vid));
        Ok(())
    }

    /// Deletes a non-default VLAN. Every port whose pvid/native referenced
    /// it is migrated back to the default VLAN; `allowed` sets are purged of
    /// it; the record is deactivated.
    pub fn delete(&self, vid: VlanId, events: &EventBus) -> Result<()> {
        if vid.as_u16() == DEFAULT_VLAN {
            return Err(EngineError::Forbidden("cannot delete default VLAN".into()));
        }

        let mut inner = self.inner.write();
        if !inner.vlans.get(&vid.as_u16()).map(|v| v.active).unwrap_or(false) {
            return Err(EngineError::NotFound(format!("vlan {}", vid.as_u16())));
        }

        let default = Self::default_vlan_id();
        let migrate: Vec<PortId> = inner
            .ports
            .iter()
            .filter(|(_, cfg)| cfg.pvid == Some(vid) || cfg.native == Some(vid))
            .map(|(p, _)| *p)
            .collect();

        for p in migrate {
            let mode = inner.ports.get(&p).map(|c| c.mode).unwrap();
            match mode {
                PortMode::Access => {
                    self.set_mode_access_locked(&mut inner, p, default)?;
                }
                PortMode::Trunk => {
                    self.set_mode_trunk_locked(&mut inner, p, Some(default))?;
                }
                PortMode::Hybrid => {
                    self.set_mode_hybrid_locked(&mut inner, p, Some(default))?;
                }
            }
        }

        for cfg in inner.ports.values_mut() {
            cfg.allowed.remove(&vid);
        }

        if let Some(rec) = inner.vlans.get_mut(&vid.as_u16()) {
            rec.active = false;
        }
        drop(inner);

        info_log!("VlanPolicy", vid = vid.as_u16(), "vlan deleted");
        audit_log!(AuditRecord::new(AuditCategory::ResourceDelete, "VlanPolicy", "vlan_delete")
            .with_outcome(AuditOutcome::Success)
            .with_object_id(vid.as_u16().to_string())
            .with_object_type("vlan"));
        events.publish(Event::vlan(EventKind::VlanDeleted, vid));
        Ok(())
    }

    fn clear_port_membership(inner: &mut Inner, p: PortId) {
        if let Some(cfg) = inner.ports.get(&p) {
            if let Some(old) = cfg.pvid.or(cfg.native) {
                if let Some(rec) = inner.vlans.get_mut(&old.as_u16()) {
                    rec.untagged.remove(p.get() as usize);
                    // a port stays a tagged member of a trunk/hybrid's native
                    // VLAN implicitly only via `allowed`; for access mode the
                    // port is removed from membership entirely.
                }
            }
        }
    }

    fn set_mode_access_locked(&self, inner: &mut Inner, p: PortId, vid: VlanId) -> Result<()> {
        Self::clear_port_membership(inner, p);
        if let Some(old_cfg) = inner.ports.get(&p) {
            if old_cfg.mode == PortMode::Access {
                if let Some(old_pvid) = old_cfg.pvid {
                    if let Some(rec) = inner.vlans.get_mut(&old_pvid.as_u16()) {
                        rec.members.remove(p.get() as usize);
                    }
                }
            }
        }
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        if !rec.active {
            return Err(EngineError::NotFound(format!("vlan {}", vid.as_u16())));
        }
        rec.members.insert(p.get() as usize);
        rec.untagged.insert(p.get() as usize);
        inner.ports.insert(p, PortVlanConfig::access(vid));
        Ok(())
    }

    fn set_mode_trunk_locked(&self, inner: &mut Inner, p: PortId, native: Option<VlanId>) -> Result<()> {
        Self::clear_port_membership(inner, p);
        if let Some(n) = native {
            let rec = inner
                .vlans
                .get_mut(&n.as_u16())
                .ok_or_else(|| EngineError::NotFound(format!("vlan {}", n.as_u16())))?;
            rec.members.insert(p.get() as usize);
            rec.untagged.insert(p.get() as usize);
        }
        inner.ports.insert(p, PortVlanConfig::trunk(native));
        Ok(())
    }

    fn set_mode_hybrid_locked(&self, inner: &mut Inner, p: PortId, native: Option<VlanId>) -> Result<()> {
        self.set_mode_trunk_locked(inner, p, native)?;
        if let Some(cfg) = inner.ports.get_mut(&p) {
            cfg.mode = PortMode::Hybrid;
        }
        Ok(())
    }

    pub fn set_mode_access(&self, p: PortId, vid: VlanId) -> Result<()> {
        let mut inner = self.inner.write();
        self.set_mode_access_locked(&mut inner, p, vid)
    }

    pub fn set_mode_trunk(&self, p: PortId, native: Option<VlanId>) -> Result<()> {
        let mut inner = self.inner.write();
        self.set_mode_trunk_locked(&mut inner, p, native)
    }

    pub fn set_mode_hybrid(&self, p: PortId, native: Option<VlanId>) -> Result<()> {
        let mut inner = self.inner.write();
        self.set_mode_hybrid_locked(&mut inner, p, native)
    }

    pub fn add_port(&self, vid: VlanId, p: PortId, tagged: bool, events: &EventBus) -> Result<()> {
        let mut inner = self.inner.write();
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .filter(|v| v.active)
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        rec.members.insert(p.get() as usize);
        if !tagged {
            rec.untagged.insert(p.get() as usize);
        }
        drop(inner);
        events.publish(Event::vlan_port(EventKind::VlanPortChanged, vid, p));
        Ok(())
    }

    pub fn remove_port(&self, vid: VlanId, p: PortId, events: &EventBus) -> Result<()> {
        let mut inner = self.inner.write();
        let cfg_blocks = inner
            .ports
            .get(&p)
            .map(|c| c.pvid == Some(vid) || c.native == Some(vid))
            .unwrap_or(false);
        if cfg_blocks {
            return Err(EngineError::Forbidden(
                "cannot remove port from its own pvid/native VLAN".into(),
            ));
        }
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        rec.members.remove(p.get() as usize);
        rec.untagged.remove(p.get() as usize);
        drop(inner);
        events.publish(Event::vlan_port(EventKind::VlanPortChanged, vid, p));
        Ok(())
    }

    /// Fails `Forbidden` if this would tag a port within its own access or
    /// native VLAN.
    pub fn set_tagging(&self, p: PortId, vid: VlanId, tagged: bool, events: &EventBus) -> Result<()> {
        let mut inner = self.inner.write();
        let is_own_pvid_or_native = inner
            .ports
            .get(&p)
            .map(|c| c.pvid == Some(vid) || c.native == Some(vid))
            .unwrap_or(false);
        if tagged && is_own_pvid_or_native {
            return Err(EngineError::Forbidden(
                "cannot tag a port in its own access/native VLAN".into(),
            ));
        }
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        if !rec.has_member(p) {
            return Err(EngineError::NotFound(format!(
                "port {} not a member of vlan {}",
                p, vid.as_u16()
            )));
        }
        if tagged {
            rec.untagged.remove(p.get() as usize);
        } else {
            rec.untagged.insert(p.get() as usize);
        }
        drop(inner);
        events.publish(Event::vlan_port(EventKind::VlanPortChanged, vid, p));
        Ok(())
    }

    /// `set_trunk_allowed(p, native_vid, false)` is always `Forbidden`.
    pub fn set_trunk_allowed(&self, p: PortId, vid: VlanId, allowed: bool, events: &EventBus) -> Result<()> {
        let mut inner = self.inner.write();
        let cfg = inner
            .ports
            .get_mut(&p)
            .ok_or_else(|| EngineError::NotFound(format!("port {}", p)))?;
        if !matches!(cfg.mode, PortMode::Trunk | PortMode::Hybrid) {
            return Err(EngineError::InvalidState(format!(
                "port {} is not trunk/hybrid",
                p
            )));
        }
        if !allowed && cfg.native == Some(vid) {
            return Err(EngineError::Forbidden(
                "native VLAN is always allowed".into(),
            ));
        }
        if allowed {
            cfg.allowed.insert(vid);
        } else {
            cfg.allowed.remove(&vid);
        }
        drop(inner);
        events.publish(Event::vlan_port(EventKind::VlanPortChanged, vid, p));
        Ok(())
    }

    pub fn set_learning_enabled(&self, vid: VlanId, enabled: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        rec.learning_enabled = enabled;
        Ok(())
    }

    pub fn set_stp_enabled(&self, vid: VlanId, enabled: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        rec.stp_enabled = enabled;
        Ok(())
    }

    pub fn set_name(&self, vid: VlanId, name: String) -> Result<()> {
        let mut inner = self.inner.write();
        let rec = inner
            .vlans
            .get_mut(&vid.as_u16())
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))?;
        rec.name = name;
        Ok(())
    }

    // ------------------------------------------------------------- queries

    pub fn vlan_get(&self, vid: VlanId) -> Result<VlanRecord> {
        self.inner
            .read()
            .vlans
            .get(&vid.as_u16())
            .filter(|v| v.active)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("vlan {}", vid.as_u16())))
    }

    pub fn vlan_get_all(&self) -> Vec<(u16, VlanRecord)> {
        self.inner
            .read()
            .vlans
            .iter()
            .filter(|(_, v)| v.active)
            .map(|(id, v)| (*id, v.clone()))
            .collect()
    }

    pub fn vlan_get_by_port(&self, p: PortId) -> Vec<u16> {
        self.inner
            .read()
            .vlans
            .iter()
            .filter(|(_, v)| v.active && v.has_member(p))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn port_get_config(&self, p: PortId) -> Result<PortVlanConfig> {
        self.inner
            .read()
            .ports
            .get(&p)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("port {}", p)))
    }

    // --------------------------------------------------------- data plane

    /// Ingress classification (§4.B). Input: whether the frame carried a
    /// tag and, if so, which VLAN id it named.
    pub fn classify_ingress(
        &self,
        p: PortId,
        tag_vid: Option<u16>,
    ) -> std::result::Result<VlanId, DropReason> {
        let inner = self.inner.read();
        let cfg = match inner.ports.get(&p) {
            Some(c) => c,
            None => return Err(DropReason::NotMember),
        };

        if let Some(raw_vid) = tag_vid {
            if !cfg.accept_tagged || cfg.mode == PortMode::Access {
                return Err(DropReason::InvalidTag);
            }
            let vid = match VlanId::new(raw_vid) {
                Ok(v) => v,
                Err(_) => return Err(DropReason::UnknownVlan),
            };
            let rec = match inner.vlans.get(&vid.as_u16()).filter(|v| v.active) {
                Some(r) => r,
                None => return Err(DropReason::UnknownVlan),
            };
            if !rec.has_member(p) {
                return Err(DropReason::NotMember);
            }
            if matches!(cfg.mode, PortMode::Trunk | PortMode::Hybrid) && !cfg.allowed.contains(&vid) {
                return Err(DropReason::NotAllowed);
            }
            Ok(vid)
        } else {
            if !cfg.accept_untagged {
                return Err(DropReason::UntaggedRejected);
            }
            let vid = match cfg.mode {
                PortMode::Access => cfg.pvid,
                PortMode::Trunk | PortMode::Hybrid => cfg.native,
            };
            vid.ok_or(DropReason::UntaggedRejected)
        }
    }

    /// Egress decision (§4.B): whether `dst_port` emits `vid` tagged,
    /// untagged, or drops the frame as not-a-member.
    pub fn egress_decision(&self, dst_port: PortId, vid: VlanId) -> EgressDecision {
        let inner = self.inner.read();
        match inner.vlans.get(&vid.as_u16()).filter(|v| v.active) {
            Some(rec) if rec.has_member(dst_port) => {
                if rec.is_untagged(dst_port) {
                    EgressDecision::Untagged
                } else {
                    EgressDecision::Tagged(vid)
                }
            }
            _ => EgressDecision::Drop,
        }
    }

    /// `members(vid) \ {ingress_port}`, excluding administratively-disabled
    /// or oper-down ports.
    pub fn flood_set(&self, vid: VlanId, ingress_port: PortId, ports: &PortRegistry) -> Vec<PortId> {
        let inner = self.inner.read();
        let rec = match inner.vlans.get(&vid.as_u16()).filter(|v| v.active) {
            Some(r) => r,
            None => return Vec::new(),
        };
        rec.members
            .iter()
            .map(|idx| PortId::new(idx as u16))
            .filter(|p| *p != ingress_port)
            .filter(|p| ports.admin_up(*p).unwrap_or(false) && ports.oper_up(*p).unwrap_or(false))
            .collect()
    }

    pub fn learning_enabled(&self, vid: VlanId) -> bool {
        self.inner
            .read()
            .vlans
            .get(&vid.as_u16())
            .map(|v| v.active && v.learning_enabled)
            .unwrap_or(false)
    }

    pub fn is_active(&self, vid: VlanId) -> bool {
        self.inner
            .read()
            .vlans
            .get(&vid.as_u16())
            .map(|v| v.active)
            .unwrap_or(false)
    }
}
