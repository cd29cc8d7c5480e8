//! `linuxhost facts` - print what the host reports

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use hostkit::certs::encode_hex_colon;
use hostkit::{AdapterRecord, CertificateRecord, GroupRecord, UserRecord};
use serde::Serialize;

use super::connect;
use crate::Context;
use crate::cli::FactKind;
use crate::ui;

pub fn run(ctx: &Context, kind: FactKind, json: bool) -> Result<()> {
    let (_manifest, host) = connect(ctx)?;

    match kind {
        FactKind::Interfaces => {
            let adapters = host.adapters()?;
            if json {
                return print_json(&adapters);
            }
            ui::header(&format!("Interfaces on {}", host.target()));
            for adapter in &adapters {
                println!("{}", interface_line(adapter));
            }
        }
        FactKind::Users => {
            let users = host.users()?;
            if json {
                return print_json(&users);
            }
            ui::header(&format!("Users on {}", host.target()));
            for user in &users {
                println!("{}", user_line(user));
            }
        }
        FactKind::Groups => {
            let groups = host.groups()?;
            if json {
                return print_json(&groups);
            }
            ui::header(&format!("Groups on {}", host.target()));
            for group in &groups {
                println!("{}", group_line(group));
            }
        }
        FactKind::Certificates => {
            let certs = host.certificates()?;
            if json {
                return print_json(&certs);
            }
            ui::header(&format!("Trusted certificates on {}", host.target()));
            for cert in &certs {
                println!("{}", certificate_line(cert));
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize facts")?;
    println!("{text}");
    Ok(())
}

fn interface_line(adapter: &AdapterRecord) -> String {
    let state = if adapter.is_up {
        "up".green()
    } else {
        "down".red()
    };
    let addresses: Vec<String> = adapter
        .ipv4
        .iter()
        .chain(adapter.ipv6.iter())
        .map(ToString::to_string)
        .collect();

    let mut line = format!("  {:<16} {:<8} {:<5} {}", adapter.name, adapter.kind, state, addresses.join(" "));
    if let Some(parent) = &adapter.parent {
        line.push_str(&format!(" {}", format!("@{parent}").dimmed()));
    }
    if adapter.dhcp_client_active == Some(true) {
        line.push_str(&format!(" {}", "[dhcp]".cyan()));
    }
    line
}

fn user_line(user: &UserRecord) -> String {
    let groups: Vec<&str> = user.groups.iter().map(String::as_str).collect();
    format!(
        "  {:<16} {:>6}:{:<6} {:<24} {} {}",
        user.username,
        user.uid,
        user.gid,
        user.home_directory,
        user.shell.dimmed(),
        groups.join(",")
    )
}

fn group_line(group: &GroupRecord) -> String {
    let members: Vec<&str> = group.members.iter().map(String::as_str).collect();
    format!("  {:<20} {:>6} {}", group.name, group.gid, members.join(",").dimmed())
}

fn certificate_line(cert: &CertificateRecord) -> String {
    format!(
        "  {}\n    {}",
        ui::truncate(&cert.subject, 72),
        encode_hex_colon(&cert.fingerprint).dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_group_line_lists_members() {
        colored::control::set_override(false);
        let group = GroupRecord {
            gid: 2000,
            name: "devs".into(),
            members: BTreeSet::from(["bob".to_string(), "alice".to_string()]),
        };
        let line = group_line(&group);
        assert!(line.contains("devs"));
        assert!(line.ends_with("alice,bob"));
    }

    #[test]
    fn test_interface_line_marks_dhcp() {
        colored::control::set_override(false);
        let adapter = AdapterRecord {
            name: "eth0".into(),
            is_up: true,
            dhcp_client_active: Some(true),
            ..Default::default()
        };
        let line = interface_line(&adapter);
        assert!(line.contains("eth0"));
        assert!(line.contains("[dhcp]"));
    }
}
