//! Virtual links: bridge, dummy, veth, vlan and vxlan

use anyhow::{Context, Result, anyhow, bail};
use declarative::{Change, ChangeSet, StateEntry, TypedResource};
use hostkit::net::link::DEFAULT_VXLAN_PORT;
use hostkit::net::{Adapters, LinkCommon, LinkSpec, LinkState};
use hostkit::{AdapterKind, AdapterRecord, Host};
use serde_json::Value;
use std::sync::Arc;

use super::{STAGE_BRIDGE, STAGE_LINK, STAGE_STACKED_LINK, not_created, still_present, stored, to_value};

pub const TYPE: &str = "interface";

/// A link identified by its interface name
#[derive(Debug)]
pub struct Interface {
    spec: LinkSpec,
    host: Arc<Host>,
}

fn observe_common(adapters: &Adapters, record: &AdapterRecord) -> Result<LinkCommon> {
    Ok(LinkCommon {
        name: record.name.clone(),
        state: Some(LinkState::from_up(record.admin_up)),
        master: adapters.master_of(record)?.map(|bridge| bridge.name.clone()),
        dhcp: record.dhcp_client_active.unwrap_or(false),
    })
}

/// Describe a live adapter the way a manifest would declare it.
///
/// The observed spec always carries a state. A veth whose peer is not in
/// this batch (moved to another namespace) keeps only the peer's name.
pub fn observe(adapters: &Adapters, record: &AdapterRecord) -> Result<LinkSpec> {
    let common = observe_common(adapters, record)?;
    let missing = |what: &str| anyhow!("Interface '{}' is reported without its {what}", record.name);

    Ok(match record.kind {
        AdapterKind::Bridge => LinkSpec::Bridge { common },
        AdapterKind::Dummy => LinkSpec::Dummy { common },
        AdapterKind::Vlan => LinkSpec::Vlan {
            common,
            parent: record.parent.clone().ok_or_else(|| missing("parent link"))?,
            vid: record.vlan_id.ok_or_else(|| missing("vlan id"))?,
        },
        AdapterKind::Vxlan => LinkSpec::Vxlan {
            common,
            vni: record.vxlan_id.ok_or_else(|| missing("vxlan id"))?,
            port: record.vxlan_port.unwrap_or(DEFAULT_VXLAN_PORT),
        },
        AdapterKind::Veth => {
            let peer_name = record.parent.clone().ok_or_else(|| missing("peer"))?;
            let peer = match adapters.by_name(&peer_name) {
                Some(peer) => observe_common(adapters, peer)?,
                None => LinkCommon::named(peer_name),
            };
            LinkSpec::Veth { common, peer }
        }
        AdapterKind::Unknown => {
            bail!("Interface '{}' is not a link type that can be managed", record.name)
        }
    })
}

fn common_changes(
    mut changes: ChangeSet,
    prefix: &str,
    desired: &LinkCommon,
    live: &LinkCommon,
) -> ChangeSet {
    if let Some(state) = desired.state {
        changes = changes.update(&format!("{prefix}state"), live.state.as_ref(), Some(&state));
    }
    changes
        .update(
            &format!("{prefix}master"),
            live.master.as_deref(),
            desired.master.as_deref(),
        )
        .update(&format!("{prefix}dhcp"), Some(&live.dhcp), Some(&desired.dhcp))
}

impl Interface {
    pub fn new(spec: LinkSpec, host: Arc<Host>) -> Self {
        Self { spec, host }
    }

    pub fn from_entry(entry: &StateEntry, host: Arc<Host>) -> Result<Self> {
        Ok(Self::new(stored(entry)?, host))
    }

    fn read_back(&self) -> Result<LinkSpec> {
        let adapters = self.host.refresh_adapters()?;
        match adapters.by_name(self.spec.name()) {
            Some(record) => observe(&adapters, record),
            None => Err(not_created(TYPE, self.spec.name()).into()),
        }
    }
}

impl TypedResource for Interface {
    type State = LinkSpec;

    fn id(&self) -> String {
        self.spec.name().to_string()
    }

    fn description(&self) -> String {
        match &self.spec {
            LinkSpec::Veth { common, peer } => format!("veth {} <-> {}", common.name, peer.name),
            LinkSpec::Vlan { common, parent, vid } => {
                format!("vlan {} on {parent} (id {vid})", common.name)
            }
            LinkSpec::Vxlan { common, vni, .. } => format!("vxlan {} (vni {vni})", common.name),
            other => format!("{} {}", other.kind(), other.name()),
        }
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn stage(&self) -> u8 {
        match self.spec {
            LinkSpec::Bridge { .. } => STAGE_BRIDGE,
            LinkSpec::Vlan { .. } => STAGE_STACKED_LINK,
            _ => STAGE_LINK,
        }
    }

    fn create(&self) -> Result<LinkSpec> {
        self.host.run_all(&self.spec.create_commands())?;
        self.read_back()
    }

    fn read(&self, prior: &LinkSpec) -> Result<Option<LinkSpec>> {
        let adapters = self.host.adapters()?;
        adapters
            .by_name(prior.name())
            .map(|record| observe(&adapters, record))
            .transpose()
    }

    fn compare(&self, live: &LinkSpec) -> Result<Change> {
        let desired = &self.spec;
        let mut changes = ChangeSet::new().replace("type", Some(&live.kind()), Some(&desired.kind()));

        match (desired, live) {
            (LinkSpec::Veth { peer, .. }, LinkSpec::Veth { peer: old, .. }) => {
                changes = changes.replace("peer", Some(old.name.as_str()), Some(peer.name.as_str()));
                if peer.name == old.name {
                    changes = common_changes(changes, "peer.", peer, old);
                }
            }
            (
                LinkSpec::Vlan { parent, vid, .. },
                LinkSpec::Vlan {
                    parent: old_parent,
                    vid: old_vid,
                    ..
                },
            ) => {
                changes = changes
                    .replace("parent", Some(old_parent.as_str()), Some(parent.as_str()))
                    .replace("vid", Some(old_vid), Some(vid));
            }
            (
                LinkSpec::Vxlan { vni, port, .. },
                LinkSpec::Vxlan {
                    vni: old_vni,
                    port: old_port,
                    ..
                },
            ) => {
                changes = changes
                    .replace("vni", Some(old_vni), Some(vni))
                    .replace("port", Some(old_port), Some(port));
            }
            _ => {}
        }

        Ok(common_changes(changes, "", desired.common(), live.common()).finish())
    }

    fn update(&self, prior: &LinkSpec) -> Result<LinkSpec> {
        let commands = self.spec.update_commands(prior).with_context(|| {
            format!("Interface '{}' cannot be changed in place", self.spec.name())
        })?;
        self.host.run_all(&commands)?;
        self.read_back()
    }

    fn delete(&self, prior: &LinkSpec) -> Result<()> {
        self.host.run(&prior.delete_command())?;
        if self.host.adapters()?.by_name(prior.name()).is_some() {
            return Err(still_present(TYPE, prior.name()).into());
        }
        Ok(())
    }
}

/// Adopt the link named `key`
pub fn import(host: &Host, key: &str) -> Result<(String, Value)> {
    let adapters = host.adapters()?;
    let Some(record) = adapters.by_name(key) else {
        bail!("No interface named '{key}' on {}", host.target());
    };
    Ok((key.to_string(), to_value(&observe(&adapters, record)?)?))
}
