//! Records parsed from host command output, and the command type sent back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A fully formed shell command, ready to send to an executor.
///
/// Builders in this crate are the only producers of commands that mutate
/// the host; the string already carries its `sudo` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Wrap a raw command string.
    pub fn new(command: impl Into<String>) -> Self {
        Self(command.into())
    }

    /// The command text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        command.0
    }
}

/// An address with its prefix length, as listed by `ip a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpWithPrefix {
    pub address: String,
    pub prefix_len: u8,
}

impl fmt::Display for IpWithPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Link kind as inferred from `ip -d a` details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    #[default]
    Unknown,
    Dummy,
    Vlan,
    Vxlan,
    Bridge,
    Veth,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Unknown => "unknown",
            AdapterKind::Dummy => "dummy",
            AdapterKind::Vlan => "vlan",
            AdapterKind::Vxlan => "vxlan",
            AdapterKind::Bridge => "bridge",
            AdapterKind::Veth => "veth",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network interface from a single `ip -d a` pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdapterRecord {
    /// Interface name without any `@parent` suffix
    pub name: String,
    /// Hardware address, empty when the link has none
    pub mac: String,
    /// Operational state is UP or UNKNOWN
    pub is_up: bool,
    /// `UP` is among the header flags (`ip link set <name> up`)
    #[serde(default)]
    pub admin_up: bool,
    /// IPv4 addresses in listing order
    pub ipv4: Vec<IpWithPrefix>,
    /// IPv6 addresses in listing order
    pub ipv6: Vec<IpWithPrefix>,
    pub kind: AdapterKind,
    /// Name after `@` in the header (vlan parent, veth peer, ...)
    pub parent: Option<String>,
    pub vlan_id: Option<u16>,
    pub vxlan_id: Option<u32>,
    pub vxlan_port: Option<u16>,
    /// `bridge_id` when this link is a bridge
    pub bridge_id: Option<String>,
    pub vlan_filtering: Option<bool>,
    /// `designated_bridge` when this link is enslaved to a bridge
    pub designated_bridge_id: Option<String>,
    /// Set by the dhclient pass; `None` until that pass runs
    pub dhcp_client_active: Option<bool>,
}

impl AdapterRecord {
    /// Whether `cidr` (`address/prefix`) is assigned to this link.
    pub fn has_address(&self, cidr: &str) -> bool {
        self.ipv4
            .iter()
            .chain(self.ipv6.iter())
            .any(|ip| ip.to_string() == cidr)
    }
}

/// One `/etc/group` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub gid: i64,
    pub name: String,
    pub members: BTreeSet<String>,
}

/// One `/etc/passwd` entry, correlated with the group table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub uid: i64,
    pub gid: i64,
    /// Name of the group whose gid is `gid`
    pub primary_group: String,
    /// Primary group plus every group listing this user as a member
    pub groups: BTreeSet<String>,
    pub home_directory: String,
    pub shell: String,
    pub hostname: String,
}

/// One X.509 certificate from a PEM bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// SHA-256 over the DER encoding
    pub fingerprint: [u8; 32],
    /// Big-endian serial, left-padded with zeros
    pub serial_number: [u8; 20],
    pub subject: String,
    /// Re-encoded from the DER bytes
    pub pem: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_address_checks_both_families() {
        let adapter = AdapterRecord {
            name: "eth0".into(),
            ipv4: vec![IpWithPrefix {
                address: "10.0.0.5".into(),
                prefix_len: 24,
            }],
            ipv6: vec![IpWithPrefix {
                address: "fe80::1".into(),
                prefix_len: 64,
            }],
            ..Default::default()
        };
        assert!(adapter.has_address("10.0.0.5/24"));
        assert!(adapter.has_address("fe80::1/64"));
        assert!(!adapter.has_address("10.0.0.5/16"));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&AdapterKind::Vxlan).unwrap();
        assert_eq!(json, "\"vxlan\"");
    }
}
