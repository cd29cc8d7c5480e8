//! `ip -d a` parsing.
//!
//! A header line (`3: eth0.100@eth0: <BROADCAST,MULTICAST,UP> ... state UP`)
//! opens a new record. Indented lines up to the next header fill in
//! addresses, the hardware address and the link-info details that
//! `ip -d` prints for vlan, vxlan, bridge and bridge-port links.

use crate::error::{Error, Result};
use crate::parser::{LineParser, ParseState};
use crate::types::{AdapterKind, AdapterRecord, IpWithPrefix};
use regex::Regex;
use serde::Serialize;
use std::str::FromStr;
use std::sync::LazyLock;

const SOURCE: &str = "ip -d a";

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+: ([a-zA-Z0-9\._-]+)[a-zA-Z0-9@\.-]*:").expect("header regex")
});
static STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"state (UP|DOWN|UNKNOWN)").expect("state regex"));
static FLAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+: [^<]*<([^>]*)>").expect("flags regex"));
static NOARP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*(NOARP).*>").expect("noarp regex"));
static PARENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^:]+):").expect("parent regex"));
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"inet (\d+\.\d+\.\d+\.\d+)/(\d+)").expect("ipv4 regex")
});
static IPV6: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"inet6 ([a-fA-F0-9:]+)/(\d+)").expect("ipv6 regex"));
static MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ether|loopback)\s*(([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2}))").expect("mac regex")
});
static VLAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vlan protocol 802\.1Q id (\d+)").expect("vlan regex"));
static VXLAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^vxlan id (\d+)").expect("vxlan regex"));
static DSTPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdstport (\d+)").expect("dstport regex"));
static VLAN_FILTERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvlan_filtering (\d+)").expect("vlan_filtering regex"));
static BRIDGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbridge_id ([0-9a-fA-F.:]+)").expect("bridge_id regex"));
static DESIGNATED_BRIDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdesignated_bridge ([0-9a-fA-F.:]+)").expect("designated_bridge regex")
});

fn number<N: FromStr>(text: &str, what: &str) -> Result<N> {
    text.parse()
        .map_err(|_| Error::parse(SOURCE, format!("{what} '{text}' is out of range")))
}

fn header(state: &mut ParseState<AdapterRecord>, line: &str) -> Result<()> {
    let line = line.trim();
    let Some(caps) = HEADER.captures(line) else {
        return Ok(());
    };

    let mut adapter = AdapterRecord {
        name: caps[1].to_string(),
        ..Default::default()
    };
    if let Some(state) = STATE.captures(line) {
        adapter.is_up = &state[1] != "DOWN";
    }
    if let Some(flags) = FLAGS.captures(line) {
        adapter.admin_up = flags[1].split(',').any(|flag| flag == "UP");
    }
    if NOARP.is_match(line) {
        adapter.kind = AdapterKind::Dummy;
    }
    if let Some(parent) = PARENT.captures(line) {
        adapter.parent = Some(parent[1].to_string());
    }

    state.add_item(adapter);
    Ok(())
}

fn addresses(state: &mut ParseState<AdapterRecord>, line: &str) -> Result<()> {
    let Some(adapter) = state.current_mut() else {
        return Ok(());
    };
    if let Some(caps) = IPV4.captures(line) {
        adapter.ipv4.push(IpWithPrefix {
            address: caps[1].to_string(),
            prefix_len: number(&caps[2], "prefix length")?,
        });
    }
    if let Some(caps) = IPV6.captures(line) {
        adapter.ipv6.push(IpWithPrefix {
            address: caps[1].to_string(),
            prefix_len: number(&caps[2], "prefix length")?,
        });
    }
    if let Some(caps) = MAC.captures(line) {
        adapter.mac = caps[1].to_string();
    }
    Ok(())
}

fn link_info(state: &mut ParseState<AdapterRecord>, line: &str) -> Result<()> {
    let Some(adapter) = state.current_mut() else {
        return Ok(());
    };
    let line = line.trim();

    if let Some(caps) = VLAN.captures(line) {
        adapter.vlan_id = Some(number(&caps[1], "vlan id")?);
        adapter.kind = AdapterKind::Vlan;
    }

    if let Some(caps) = VXLAN.captures(line) {
        adapter.kind = AdapterKind::Vxlan;
        adapter.vxlan_id = Some(number(&caps[1], "vxlan id")?);
        if let Some(port) = DSTPORT.captures(line) {
            adapter.vxlan_port = Some(number(&port[1], "vxlan port")?);
        }
    }

    let first = line.split_whitespace().next().unwrap_or_default();
    match first {
        "bridge" => {
            adapter.kind = AdapterKind::Bridge;
            if let Some(caps) = BRIDGE_ID.captures(line) {
                adapter.bridge_id = Some(caps[1].to_string());
            }
            if let Some(caps) = VLAN_FILTERING.captures(line) {
                adapter.vlan_filtering = Some(&caps[1] != "0");
            }
        }
        "bridge_slave" => {
            if let Some(caps) = DESIGNATED_BRIDGE.captures(line) {
                adapter.designated_bridge_id = Some(caps[1].to_string());
            }
        }
        "veth" => adapter.kind = AdapterKind::Veth,
        "dummy" => adapter.kind = AdapterKind::Dummy,
        _ => {}
    }
    Ok(())
}

/// Parse `ip -d a` output into adapter records, in listing order.
///
/// Lines before the first header are ignored. Records with no recognised
/// link-info keep [`AdapterKind::Unknown`].
pub fn parse_adapters(output: &str) -> Result<Adapters> {
    let adapters = LineParser::new(SOURCE)
        .handler(header)
        .handler(addresses)
        .handler(link_info)
        .parse(output)?;
    Ok(Adapters(adapters))
}

/// One parse batch of adapters with lookup helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Adapters(Vec<AdapterRecord>);

impl Adapters {
    pub fn new(adapters: Vec<AdapterRecord>) -> Self {
        Self(adapters)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AdapterRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<AdapterRecord> {
        self.0
    }

    /// First adapter called `name`.
    pub fn by_name(&self, name: &str) -> Option<&AdapterRecord> {
        self.0.iter().find(|a| a.name == name)
    }

    pub(crate) fn by_name_mut(&mut self, name: &str) -> Option<&mut AdapterRecord> {
        self.0.iter_mut().find(|a| a.name == name)
    }

    /// First bridge whose `bridge_id` equals `bridge_id`.
    pub fn by_bridge_id(&self, bridge_id: &str) -> Option<&AdapterRecord> {
        self.0
            .iter()
            .find(|a| a.bridge_id.as_deref() == Some(bridge_id))
    }

    /// Ports whose designated bridge is `bridge_id`.
    pub fn members_of(&self, bridge_id: &str) -> Vec<&AdapterRecord> {
        self.0
            .iter()
            .filter(|a| a.designated_bridge_id.as_deref() == Some(bridge_id))
            .collect()
    }

    /// The bridge `adapter` is enslaved to.
    ///
    /// A designated bridge id that matches no bridge in this batch is an
    /// [`Error::Inconsistent`].
    pub fn master_of(&self, adapter: &AdapterRecord) -> Result<Option<&AdapterRecord>> {
        let Some(id) = adapter.designated_bridge_id.as_deref() else {
            return Ok(None);
        };
        self.by_bridge_id(id).map(Some).ok_or_else(|| Error::Inconsistent {
            message: format!(
                "interface '{}' is a port of bridge {id}, but no bridge with that id is listed",
                adapter.name
            ),
        })
    }
}

impl<'a> IntoIterator for &'a Adapters {
    type Item = &'a AdapterRecord;
    type IntoIter = std::slice::Iter<'a, AdapterRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
