//! dhclient process correlation and lease commands.

use crate::net::adapters::Adapters;
use crate::types::Command;
use regex::Regex;
use std::sync::LazyLock;

/// Lists running dhclient processes. The trailing argument of each is the
/// interface it serves.
pub const PS_COMMAND: &str = "sudo ps -ef | grep dhclient";

static DHCLIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dhclient.* (.*)$").expect("dhclient regex"));

/// Interface names served by a dhclient process in `ps -ef` output.
///
/// The grep process itself ends in `dhclient` with no trailing argument and
/// does not match.
pub fn dhclient_interfaces(ps_output: &str) -> Vec<String> {
    ps_output
        .lines()
        .filter_map(|line| DHCLIENT.captures(line.trim_end()))
        .map(|caps| caps[1].to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Overlay dhclient state onto an already parsed adapter batch.
///
/// Every adapter ends up with `dhcp_client_active` set. Process lines naming
/// an unknown interface are ignored.
pub fn correlate_dhclient(adapters: &mut Adapters, ps_output: &str) {
    let names: Vec<String> = adapters.iter().map(|a| a.name.clone()).collect();
    for name in &names {
        if let Some(adapter) = adapters.by_name_mut(name) {
            adapter.dhcp_client_active = Some(false);
        }
    }

    for interface in dhclient_interfaces(ps_output) {
        match adapters.by_name_mut(&interface) {
            Some(adapter) => adapter.dhcp_client_active = Some(true),
            None => log::debug!("dhclient running for unknown interface {interface}"),
        }
    }
}

fn dhclient(interface: &str, tail: &str) -> Command {
    Command::new(format!(
        "sudo dhclient -4 -v -i -pf /run/dhclient.{interface}.pid \
         -lf /var/lib/dhcp/dhclient.{interface}.leases \
         -I -df /var/lib/dhcp/dhclient6.{interface}.leases {tail}"
    ))
}

/// Start a backgrounded dhclient for `interface`.
pub fn enable_command(interface: &str) -> Command {
    dhclient(interface, &format!("{interface} &"))
}

/// Release the lease held for `interface` and stop its dhclient.
pub fn release_command(interface: &str) -> Command {
    dhclient(interface, &format!("-r {interface}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::adapters::parse_adapters;

    const PS: &str = "\
root       612     1  0 09:12 ?        00:00:00 /sbin/dhclient -4 -v -i -pf /run/dhclient.eth0.pid -lf /var/lib/dhcp/dhclient.eth0.leases -I -df /var/lib/dhcp/dhclient6.eth0.leases eth0
root      4021  4019  0 10:40 ?        00:00:00 grep dhclient
root       913     1  0 09:12 ?        00:00:00 /sbin/dhclient -4 -v -i -pf /run/dhclient.wg9.pid wg9
";

    #[test]
    fn test_grep_line_is_ignored() {
        assert_eq!(dhclient_interfaces(PS), vec!["eth0", "wg9"]);
    }

    #[test]
    fn test_correlate_marks_matches_in_place() {
        let mut adapters = parse_adapters(
            "1: eth0: <UP> state UP\n    inet 10.0.0.5/24\n2: eth1: <UP> state UP\n",
        )
        .unwrap();
        correlate_dhclient(&mut adapters, PS);

        let eth0 = adapters.by_name("eth0").unwrap();
        assert_eq!(eth0.dhcp_client_active, Some(true));
        assert_eq!(eth0.ipv4.len(), 1, "other facts untouched");
        assert_eq!(
            adapters.by_name("eth1").unwrap().dhcp_client_active,
            Some(false)
        );
        assert_eq!(adapters.len(), 2, "unknown wg9 does not add a record");
    }

    #[test]
    fn test_lease_commands() {
        assert_eq!(
            enable_command("eth1").as_str(),
            "sudo dhclient -4 -v -i -pf /run/dhclient.eth1.pid -lf /var/lib/dhcp/dhclient.eth1.leases -I -df /var/lib/dhcp/dhclient6.eth1.leases eth1 &"
        );
        assert_eq!(
            release_command("eth1").as_str(),
            "sudo dhclient -4 -v -i -pf /run/dhclient.eth1.pid -lf /var/lib/dhcp/dhclient.eth1.leases -I -df /var/lib/dhcp/dhclient6.eth1.leases -r eth1"
        );
    }
}
