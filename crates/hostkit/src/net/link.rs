//! `ip link` / `ip addr` command builders.
//!
//! A [`LinkSpec`] describes one virtual link the way a manifest declares it.
//! Each kind carries the [`LinkCommon`] fields; a veth pair carries them for
//! both ends.

use crate::net::dhcp;
use crate::types::{AdapterKind, Command};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default VXLAN UDP port (IANA).
pub const DEFAULT_VXLAN_PORT: u16 = 4789;

fn default_vxlan_port() -> u16 {
    DEFAULT_VXLAN_PORT
}

/// Administrative link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    Down,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Up => "up",
            LinkState::Down => "down",
        }
    }

    pub fn from_up(is_up: bool) -> Self {
        if is_up { LinkState::Up } else { LinkState::Down }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every link kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkCommon {
    pub name: String,
    /// Left alone when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LinkState>,
    /// Bridge this link is enslaved to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    /// Run a dhclient on this link
    #[serde(default)]
    pub dhcp: bool,
}

impl LinkCommon {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Steps applied after `ip link add`: state, then master, then dhcp.
    pub fn setup_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(state) = self.state {
            commands.push(set_state(&self.name, state));
        }
        if let Some(master) = &self.master {
            commands.push(set_master(&self.name, master));
        }
        if self.dhcp {
            commands.push(dhcp::enable_command(&self.name));
        }
        commands
    }

    /// Commands moving a live link from `prior` settings to these.
    ///
    /// An unset `state` means "don't care" and never produces a command.
    pub fn update_commands(&self, prior: &LinkCommon) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(state) = self.state
            && prior.state != Some(state)
        {
            commands.push(set_state(&self.name, state));
        }
        if self.master != prior.master {
            commands.push(match &self.master {
                Some(master) => set_master(&self.name, master),
                None => set_nomaster(&self.name),
            });
        }
        if self.dhcp != prior.dhcp {
            commands.push(if self.dhcp {
                dhcp::enable_command(&self.name)
            } else {
                dhcp::release_command(&self.name)
            });
        }
        commands
    }
}

/// A declared virtual link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LinkSpec {
    Bridge {
        #[serde(flatten)]
        common: LinkCommon,
    },
    Dummy {
        #[serde(flatten)]
        common: LinkCommon,
    },
    Veth {
        #[serde(flatten)]
        common: LinkCommon,
        peer: LinkCommon,
    },
    Vlan {
        #[serde(flatten)]
        common: LinkCommon,
        parent: String,
        vid: u16,
    },
    Vxlan {
        #[serde(flatten)]
        common: LinkCommon,
        vni: u32,
        #[serde(default = "default_vxlan_port")]
        port: u16,
    },
}

impl LinkSpec {
    pub fn common(&self) -> &LinkCommon {
        match self {
            LinkSpec::Bridge { common }
            | LinkSpec::Dummy { common }
            | LinkSpec::Veth { common, .. }
            | LinkSpec::Vlan { common, .. }
            | LinkSpec::Vxlan { common, .. } => common,
        }
    }

    pub fn common_mut(&mut self) -> &mut LinkCommon {
        match self {
            LinkSpec::Bridge { common }
            | LinkSpec::Dummy { common }
            | LinkSpec::Veth { common, .. }
            | LinkSpec::Vlan { common, .. }
            | LinkSpec::Vxlan { common, .. } => common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    /// The kind `ip -d a` reports for this link once it exists.
    pub fn kind(&self) -> AdapterKind {
        match self {
            LinkSpec::Bridge { .. } => AdapterKind::Bridge,
            LinkSpec::Dummy { .. } => AdapterKind::Dummy,
            LinkSpec::Veth { .. } => AdapterKind::Veth,
            LinkSpec::Vlan { .. } => AdapterKind::Vlan,
            LinkSpec::Vxlan { .. } => AdapterKind::Vxlan,
        }
    }

    /// The `ip link add` command for this link.
    pub fn add_command(&self) -> Command {
        let name = self.name();
        Command::new(match self {
            LinkSpec::Bridge { .. } => format!("sudo ip link add {name} type bridge"),
            LinkSpec::Dummy { .. } => format!("sudo ip link add {name} type dummy"),
            LinkSpec::Veth { peer, .. } => {
                format!("sudo ip link add {name} type veth peer name {}", peer.name)
            }
            LinkSpec::Vlan { parent, vid, .. } => {
                format!("sudo ip link add link {parent} name {name} type vlan id {vid}")
            }
            LinkSpec::Vxlan { vni, port, .. } => {
                format!("sudo ip link add {name} type vxlan id {vni} dstport {port}")
            }
        })
    }

    /// Full create sequence: add, then setup for this end (and the peer).
    pub fn create_commands(&self) -> Vec<Command> {
        let mut commands = vec![self.add_command()];
        commands.extend(self.common().setup_commands());
        if let LinkSpec::Veth { peer, .. } = self {
            commands.extend(peer.setup_commands());
        }
        commands
    }

    /// In-place update commands, or `None` when the change needs a new link.
    pub fn update_commands(&self, prior: &LinkSpec) -> Option<Vec<Command>> {
        if self.requires_replace(prior) {
            return None;
        }
        let mut commands = self.common().update_commands(prior.common());
        if let (LinkSpec::Veth { peer, .. }, LinkSpec::Veth { peer: old, .. }) = (self, prior) {
            commands.extend(peer.update_commands(old));
        }
        Some(commands)
    }

    /// Whether moving from `prior` to `self` means delete and re-add.
    pub fn requires_replace(&self, prior: &LinkSpec) -> bool {
        if self.kind() != prior.kind() || self.name() != prior.name() {
            return true;
        }
        match (self, prior) {
            (LinkSpec::Veth { peer, .. }, LinkSpec::Veth { peer: old, .. }) => {
                peer.name != old.name
            }
            (
                LinkSpec::Vlan { parent, vid, .. },
                LinkSpec::Vlan {
                    parent: old_parent,
                    vid: old_vid,
                    ..
                },
            ) => parent != old_parent || vid != old_vid,
            (
                LinkSpec::Vxlan { vni, port, .. },
                LinkSpec::Vxlan {
                    vni: old_vni,
                    port: old_port,
                    ..
                },
            ) => vni != old_vni || port != old_port,
            _ => false,
        }
    }

    /// Deleting either veth end removes the pair.
    pub fn delete_command(&self) -> Command {
        delete_link(self.name())
    }
}

pub fn set_state(name: &str, state: LinkState) -> Command {
    Command::new(format!("sudo ip link set {name} {state}"))
}

pub fn set_master(name: &str, master: &str) -> Command {
    Command::new(format!("sudo ip link set {name} master {master}"))
}

pub fn set_nomaster(name: &str) -> Command {
    Command::new(format!("sudo ip link set {name} nomaster"))
}

pub fn delete_link(name: &str) -> Command {
    Command::new(format!("sudo ip link del {name}"))
}

/// `cidr` is `address/prefix`.
pub fn addr_add(cidr: &str, interface: &str) -> Command {
    Command::new(format!("sudo ip addr add {cidr} dev {interface}"))
}

pub fn addr_del(cidr: &str, interface: &str) -> Command {
    Command::new(format!("sudo ip addr del {cidr} dev {interface}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(commands: &[Command]) -> Vec<&str> {
        commands.iter().map(Command::as_str).collect()
    }

    #[test]
    fn test_add_command_per_kind() {
        let bridge = LinkSpec::Bridge {
            common: LinkCommon::named("br0"),
        };
        assert_eq!(bridge.add_command().as_str(), "sudo ip link add br0 type bridge");

        let dummy = LinkSpec::Dummy {
            common: LinkCommon::named("dummy0"),
        };
        assert_eq!(dummy.add_command().as_str(), "sudo ip link add dummy0 type dummy");

        let vlan = LinkSpec::Vlan {
            common: LinkCommon::named("eth0.100"),
            parent: "eth0".into(),
            vid: 100,
        };
        assert_eq!(
            vlan.add_command().as_str(),
            "sudo ip link add link eth0 name eth0.100 type vlan id 100"
        );

        let vxlan = LinkSpec::Vxlan {
            common: LinkCommon::named("vx10"),
            vni: 10,
            port: DEFAULT_VXLAN_PORT,
        };
        assert_eq!(
            vxlan.add_command().as_str(),
            "sudo ip link add vx10 type vxlan id 10 dstport 4789"
        );
    }

    #[test]
    fn test_create_runs_state_then_master() {
        let spec = LinkSpec::Dummy {
            common: LinkCommon {
                name: "dummy0".into(),
                state: Some(LinkState::Up),
                master: Some("br0".into()),
                dhcp: false,
            },
        };
        assert_eq!(
            strings(&spec.create_commands()),
            vec![
                "sudo ip link add dummy0 type dummy",
                "sudo ip link set dummy0 up",
                "sudo ip link set dummy0 master br0",
            ]
        );
    }

    #[test]
    fn test_veth_setup_applies_to_both_ends() {
        let spec = LinkSpec::Veth {
            common: LinkCommon {
                name: "veth0".into(),
                state: Some(LinkState::Up),
                ..Default::default()
            },
            peer: LinkCommon {
                name: "veth1".into(),
                state: Some(LinkState::Down),
                master: Some("br0".into()),
                dhcp: false,
            },
        };
        assert_eq!(
            strings(&spec.create_commands()),
            vec![
                "sudo ip link add veth0 type veth peer name veth1",
                "sudo ip link set veth0 up",
                "sudo ip link set veth1 down",
                "sudo ip link set veth1 master br0",
            ]
        );
    }

    #[test]
    fn test_update_in_place() {
        let prior = LinkSpec::Bridge {
            common: LinkCommon {
                name: "br0".into(),
                state: Some(LinkState::Down),
                master: None,
                dhcp: true,
            },
        };
        let desired = LinkSpec::Bridge {
            common: LinkCommon {
                name: "br0".into(),
                state: Some(LinkState::Up),
                master: None,
                dhcp: false,
            },
        };
        let commands = desired.update_commands(&prior).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].as_str(), "sudo ip link set br0 up");
        assert!(commands[1].as_str().ends_with("-r br0"));
    }

    #[test]
    fn test_removed_master_sets_nomaster() {
        let mut prior = LinkCommon::named("eth1");
        prior.master = Some("br0".into());
        let desired = LinkCommon::named("eth1");
        assert_eq!(
            strings(&desired.update_commands(&prior)),
            vec!["sudo ip link set eth1 nomaster"]
        );
    }

    #[test]
    fn test_identity_changes_require_replace() {
        let prior = LinkSpec::Vlan {
            common: LinkCommon::named("eth0.100"),
            parent: "eth0".into(),
            vid: 100,
        };
        let moved = LinkSpec::Vlan {
            common: LinkCommon::named("eth0.100"),
            parent: "eth0".into(),
            vid: 200,
        };
        assert!(moved.requires_replace(&prior));
        assert!(moved.update_commands(&prior).is_none());

        let other_kind = LinkSpec::Dummy {
            common: LinkCommon::named("eth0.100"),
        };
        assert!(other_kind.requires_replace(&prior));

        let mut same = prior.clone();
        same.common_mut().state = Some(LinkState::Up);
        assert!(!same.requires_replace(&prior));
    }

    #[test]
    fn test_deserialize_tagged_with_default_port() {
        let spec: LinkSpec = serde_json::from_str(
            r#"{"type": "vxlan", "name": "vx10", "vni": 10, "state": "up"}"#,
        )
        .unwrap();
        match spec {
            LinkSpec::Vxlan { common, vni, port } => {
                assert_eq!(common.name, "vx10");
                assert_eq!(common.state, Some(LinkState::Up));
                assert_eq!(vni, 10);
                assert_eq!(port, DEFAULT_VXLAN_PORT);
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn test_addr_commands() {
        assert_eq!(
            addr_add("10.0.0.5/24", "eth0").as_str(),
            "sudo ip addr add 10.0.0.5/24 dev eth0"
        );
        assert_eq!(
            addr_del("10.0.0.5/24", "eth0").as_str(),
            "sudo ip addr del 10.0.0.5/24 dev eth0"
        );
    }
}
