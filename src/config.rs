//! The TOML manifest describing one host's desired state.
//!
//! ```toml
//! [connection]
//! host = "10.0.0.2"
//! username = "admin"
//!
//! [[group]]
//! name = "devs"
//! gid = 2000
//!
//! [[user]]
//! username = "alice"
//! primary_group = "devs"
//!
//! [[interface]]
//! type = "bridge"
//! name = "br0"
//! state = "up"
//!
//! [[ip_address]]
//! interface = "br0"
//! address = "192.168.50.1/24"
//! ```

use anyhow::{Context, Result, bail};
use hostkit::Host;
use hostkit::accounts::{GroupSpec, UserSpec};
use hostkit::backend::ssh::SshConfig;
use hostkit::net::LinkSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::LazyLock;

use crate::paths;
use regex::Regex;

/// Linux limits interface names to 15 bytes
const MAX_IFNAME_LEN: usize = 15;

/// `useradd` refuses longer names
const MAX_ACCOUNT_NAME_LEN: usize = 32;

// Names are passed to commands unquoted.
static ACCOUNT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]*\$?$").expect("account name regex"));
static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("file name regex"));

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub connection: Connection,
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,
    #[serde(default, rename = "user")]
    pub users: Vec<UserConfig>,
    #[serde(default, rename = "interface")]
    pub interfaces: Vec<LinkSpec>,
    #[serde(default, rename = "ip_address")]
    pub ip_addresses: Vec<IpAddressConfig>,
    #[serde(default, rename = "ca_certificate")]
    pub ca_certificates: Vec<CaCertificateConfig>,
}

/// How to reach the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Connection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub identity_file: Option<String>,
    /// Extra `ssh -o` options
    #[serde(default)]
    pub ssh_options: Vec<String>,
    /// Run commands on this machine instead of over SSH
    #[serde(default)]
    pub local: bool,
}

fn default_port() -> u16 {
    22
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            username: None,
            identity_file: None,
            ssh_options: Vec::new(),
            local: false,
        }
    }
}

impl Connection {
    /// SSH settings, or `None` for a local connection
    pub fn ssh_config(&self) -> Result<Option<SshConfig>> {
        if self.local {
            return Ok(None);
        }
        let host = self
            .host
            .as_deref()
            .context("[connection] needs `host`, or `local = true`")?;

        let mut config = SshConfig::new(host);
        config.port = self.port;
        config.username = self.username.clone();
        config.identity_file = self.identity_file.as_deref().map(paths::expand);
        config.options = self.ssh_options.clone();
        Ok(Some(config))
    }

    /// Open a handle to the host this connection describes
    pub fn open(&self) -> Result<Host> {
        Ok(match self.ssh_config()? {
            Some(config) => Host::ssh(config),
            None => Host::local(),
        })
    }
}

/// A `[[group]]` entry.
///
/// `id` is the stable address of the entry; it defaults to the group name,
/// and setting it lets the group be renamed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub spec: GroupSpec,
}

impl GroupConfig {
    pub fn address_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.spec.name)
    }
}

/// A `[[user]]` entry; `id` works as for groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub spec: UserSpec,
}

impl UserConfig {
    pub fn address_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.spec.username)
    }
}

/// An address assigned to an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpAddressConfig {
    pub interface: String,
    /// `address/prefix`
    pub address: String,
}

impl IpAddressConfig {
    /// `<interface>/<address>/<prefix>`
    pub fn address_id(&self) -> String {
        format!("{}/{}", self.interface, self.address)
    }
}

/// Parse `address/prefix` into its canonical text form.
///
/// IPv6 addresses are compressed the same way `ip a` prints them.
pub fn normalize_cidr(cidr: &str) -> Result<String> {
    let (address, prefix) = cidr
        .split_once('/')
        .with_context(|| format!("'{cidr}' is not in address/prefix form"))?;
    let address: IpAddr = address
        .parse()
        .with_context(|| format!("'{address}' is not an IP address"))?;
    let prefix: u8 = prefix
        .parse()
        .with_context(|| format!("'{prefix}' is not a prefix length"))?;
    let max = if address.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        bail!("prefix /{prefix} is too long for {address}");
    }
    Ok(format!("{address}/{prefix}"))
}

/// A CA certificate to install into the system trust store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaCertificateConfig {
    /// File name under the CA directory, without `.crt`
    pub name: String,
    /// Inline PEM
    #[serde(default)]
    pub certificate: Option<String>,
    /// Local path to a PEM file
    #[serde(default)]
    pub source: Option<String>,
}

impl CaCertificateConfig {
    /// The PEM text, read from `source` when not inline
    pub fn content(&self) -> Result<String> {
        match (&self.certificate, &self.source) {
            (Some(pem), None) => Ok(pem.clone()),
            (None, Some(source)) => {
                let path = paths::expand(source);
                fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read certificate {}", path.display()))
            }
            _ => bail!(
                "ca_certificate '{}': set exactly one of `certificate` or `source`",
                self.name
            ),
        }
    }
}

// ============================================================================
// Loading and validation
// ============================================================================

const GROUP_KEYS: &[&str] = &["id", "name", "gid"];
const USER_KEYS: &[&str] = &[
    "id",
    "username",
    "uid",
    "gid",
    "primary_group",
    "home_directory",
    "shell",
];
const LINK_KEYS: &[&str] = &["name", "state", "master", "dhcp"];

fn entry_tables<'a>(document: &'a toml::Table, section: &str) -> Vec<&'a toml::Table> {
    document
        .get(section)
        .and_then(toml::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(toml::Value::as_table)
        .collect()
}

fn unknown_key<'a>(entry: &'a toml::Table, allowed: &[&str]) -> Option<&'a str> {
    entry
        .keys()
        .map(String::as_str)
        .find(|key| !allowed.contains(key))
}

/// Reject misspelled keys in user, group and interface entries.
///
/// Those entries deserialize through flattened or tagged types, where
/// `deny_unknown_fields` has no effect.
fn check_entry_keys(document: &toml::Table) -> Result<()> {
    for (section, allowed) in [("group", GROUP_KEYS), ("user", USER_KEYS)] {
        for (index, entry) in entry_tables(document, section).into_iter().enumerate() {
            if let Some(key) = unknown_key(entry, allowed) {
                bail!("[[{section}]] entry #{}: unknown key `{key}`", index + 1);
            }
        }
    }

    for (index, entry) in entry_tables(document, "interface").into_iter().enumerate() {
        let kind = entry
            .get("type")
            .and_then(toml::Value::as_str)
            .unwrap_or_default();
        let extra: &[&str] = match kind {
            "veth" => &["peer"],
            "vlan" => &["parent", "vid"],
            "vxlan" => &["vni", "port"],
            _ => &[],
        };
        let allowed: Vec<&str> = ["type"]
            .iter()
            .chain(LINK_KEYS)
            .chain(extra)
            .copied()
            .collect();
        if let Some(key) = unknown_key(entry, &allowed) {
            bail!("[[interface]] entry #{}: unknown key `{key}`", index + 1);
        }
        if let Some(peer) = entry.get("peer").and_then(toml::Value::as_table)
            && let Some(key) = unknown_key(peer, LINK_KEYS)
        {
            bail!("[[interface]] entry #{}: unknown key `peer.{key}`", index + 1);
        }
    }
    Ok(())
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let mut manifest = Self::from_toml(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        manifest
            .validate()
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        log::debug!("Loaded manifest from {}", path.display());
        Ok(manifest)
    }

    /// Parse manifest text without validating the values.
    pub fn from_toml(content: &str) -> Result<Self> {
        let document: toml::Table = toml::from_str(content)?;
        check_entry_keys(&document)?;
        Ok(toml::from_str(content)?)
    }

    /// Check every entry before anything touches the host.
    ///
    /// Also rewrites IP addresses into canonical form.
    pub fn validate(&mut self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut claim = |resource_type: &str, id: &str| -> Result<()> {
            if !seen.insert(format!("{resource_type}.{id}")) {
                bail!("{resource_type} '{id}' is declared more than once");
            }
            Ok(())
        };

        for group in &self.groups {
            validate_account_name("group", &group.spec.name)?;
            claim("group", group.address_id())?;
        }

        for user in &self.users {
            validate_account_name("user", &user.spec.username)?;
            if let Some(group) = &user.spec.primary_group {
                validate_account_name("primary_group", group)?;
            }
            for path in [&user.spec.home_directory, &user.spec.shell].into_iter().flatten() {
                if !path.starts_with('/') || path.contains('\'') {
                    bail!("user '{}': '{path}' must be an absolute path without quotes", user.spec.username);
                }
            }
            user.spec.validate()?;
            claim("user", user.address_id())?;
        }

        for link in &self.interfaces {
            validate_link(link)?;
            claim("interface", link.name())?;
            if let LinkSpec::Veth { peer, .. } = link {
                claim("interface", &peer.name)?;
            }
        }

        for ip in &mut self.ip_addresses {
            ip.address = normalize_cidr(&ip.address)
                .with_context(|| format!("ip_address on '{}'", ip.interface))?;
            claim("ip_address", &ip.address_id())?;
        }

        for cert in &self.ca_certificates {
            if !FILE_NAME.is_match(&cert.name) {
                bail!("ca_certificate name '{}' must be a plain file name", cert.name);
            }
            if cert.certificate.is_some() == cert.source.is_some() {
                bail!(
                    "ca_certificate '{}': set exactly one of `certificate` or `source`",
                    cert.name
                );
            }
            claim("ca_certificate", &cert.name)?;
        }

        Ok(())
    }

    /// Number of declared resources
    pub fn resource_count(&self) -> usize {
        self.groups.len()
            + self.users.len()
            + self.interfaces.len()
            + self.ip_addresses.len()
            + self.ca_certificates.len()
    }
}

fn validate_ifname(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_IFNAME_LEN {
        bail!("interface name '{name}' must be 1 to {MAX_IFNAME_LEN} bytes");
    }
    if !FILE_NAME.is_match(name) {
        bail!("interface name '{name}' contains an invalid character");
    }
    Ok(())
}

fn validate_account_name(what: &str, name: &str) -> Result<()> {
    if name.len() > MAX_ACCOUNT_NAME_LEN || !ACCOUNT_NAME.is_match(name) {
        bail!("{what} name '{name}' is not a valid account name");
    }
    Ok(())
}

fn validate_link(link: &LinkSpec) -> Result<()> {
    validate_ifname(link.name())?;
    match link {
        LinkSpec::Veth { peer, common } => {
            validate_ifname(&peer.name)?;
            if peer.name == common.name {
                bail!("veth '{}' cannot be its own peer", common.name);
            }
        }
        LinkSpec::Vlan { vid, parent, .. } => {
            validate_ifname(parent)?;
            if !(1..=4094).contains(vid) {
                bail!("vlan '{}': vid {vid} is outside 1-4094", link.name());
            }
        }
        LinkSpec::Vxlan { vni, .. } => {
            if *vni >= 1 << 24 {
                bail!("vxlan '{}': vni {vni} does not fit in 24 bits", link.name());
            }
        }
        LinkSpec::Bridge { .. } | LinkSpec::Dummy { .. } => {}
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
