//! Addresses assigned to a link

use anyhow::{Result, bail};
use declarative::{Change, ChangeSet, StateEntry, TypedResource};
use hostkit::Host;
use hostkit::net::link::{addr_add, addr_del};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{STAGE_IP_ADDRESS, not_created, still_present, stored, to_value};
use crate::config::normalize_cidr;

pub const TYPE: &str = "ip_address";

/// Stored state: the address as `ip a` lists it, and its link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressRecord {
    pub interface: String,
    /// `address/prefix`
    pub address: String,
}

impl IpAddressRecord {
    fn id(&self) -> String {
        format!("{}/{}", self.interface, self.address)
    }
}

#[derive(Debug)]
pub struct IpAddress {
    desired: IpAddressRecord,
    host: Arc<Host>,
}

impl IpAddress {
    /// `address` must already be normalized
    pub fn new(interface: &str, address: &str, host: Arc<Host>) -> Self {
        Self {
            desired: IpAddressRecord {
                interface: interface.to_string(),
                address: address.to_string(),
            },
            host,
        }
    }

    pub fn from_entry(entry: &StateEntry, host: Arc<Host>) -> Result<Self> {
        let record: IpAddressRecord = stored(entry)?;
        Ok(Self::new(&record.interface, &record.address, host))
    }

    fn is_assigned(&self, record: &IpAddressRecord) -> Result<bool> {
        let adapters = self.host.adapters()?;
        Ok(adapters
            .by_name(&record.interface)
            .is_some_and(|adapter| adapter.has_address(&record.address)))
    }

    fn read_back(&self) -> Result<IpAddressRecord> {
        if !self.is_assigned(&self.desired)? {
            return Err(not_created(TYPE, &self.desired.id()).into());
        }
        Ok(self.desired.clone())
    }
}

impl TypedResource for IpAddress {
    type State = IpAddressRecord;

    fn id(&self) -> String {
        self.desired.id()
    }

    fn description(&self) -> String {
        format!("{} on {}", self.desired.address, self.desired.interface)
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn stage(&self) -> u8 {
        STAGE_IP_ADDRESS
    }

    fn create(&self) -> Result<IpAddressRecord> {
        self.host
            .run(&addr_add(&self.desired.address, &self.desired.interface))?;
        self.read_back()
    }

    fn read(&self, prior: &IpAddressRecord) -> Result<Option<IpAddressRecord>> {
        Ok(self.is_assigned(prior)?.then(|| prior.clone()))
    }

    fn compare(&self, live: &IpAddressRecord) -> Result<Change> {
        Ok(ChangeSet::new()
            .replace(
                "interface",
                Some(live.interface.as_str()),
                Some(self.desired.interface.as_str()),
            )
            .replace(
                "address",
                Some(live.address.as_str()),
                Some(self.desired.address.as_str()),
            )
            .finish())
    }

    fn update(&self, prior: &IpAddressRecord) -> Result<IpAddressRecord> {
        if prior != &self.desired {
            self.host.run(&addr_del(&prior.address, &prior.interface))?;
            self.host
                .run(&addr_add(&self.desired.address, &self.desired.interface))?;
        }
        self.read_back()
    }

    fn delete(&self, prior: &IpAddressRecord) -> Result<()> {
        self.host.run(&addr_del(&prior.address, &prior.interface))?;
        if self.is_assigned(prior)? {
            return Err(still_present(TYPE, &prior.id()).into());
        }
        Ok(())
    }
}

/// Adopt `<interface>/<address>/<prefix>`
pub fn import(host: &Host, key: &str) -> Result<(String, Value)> {
    let Some((interface, cidr)) = key.split_once('/') else {
        bail!("Expected <interface>/<address>/<prefix>, got '{key}'");
    };
    let record = IpAddressRecord {
        interface: interface.to_string(),
        address: normalize_cidr(cidr)?,
    };
    let adapters = host.adapters()?;
    let assigned = adapters
        .by_name(interface)
        .is_some_and(|adapter| adapter.has_address(&record.address));
    if !assigned {
        bail!("{} is not assigned to {interface} on {}", record.address, host.target());
    }
    Ok((record.id(), to_value(&record)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use hostkit::backend::MockExecutor;
    use hostkit::net;

    const BEFORE: &str = "\
2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 state UP
    link/ether 52:54:00:ab:cd:ef brd ff:ff:ff:ff:ff:ff
    inet 192.168.1.10/24 brd 192.168.1.255 scope global eth0
";
    const AFTER: &str = "\
2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 state UP
    link/ether 52:54:00:ab:cd:ef brd ff:ff:ff:ff:ff:ff
    inet 192.168.1.10/24 brd 192.168.1.255 scope global eth0
    inet6 2001:db8::5/64 scope global
";

    fn scripted(outputs: &[&str]) -> (MockExecutor, Arc<Host>) {
        let mock = MockExecutor::new();
        for output in outputs {
            mock.respond(net::READ_COMMAND, *output);
        }
        let host = testing::host(&mock);
        (mock, host)
    }

    #[test]
    fn test_create_verifies_assignment() {
        let (mock, host) = scripted(&[AFTER]);
        let ip = IpAddress::new("eth0", "2001:db8::5/64", host);

        let record = TypedResource::create(&ip).unwrap();
        assert_eq!(record.id(), "eth0/2001:db8::5/64");
        assert_eq!(
            mock.mutations(),
            vec!["sudo ip addr add 2001:db8::5/64 dev eth0"]
        );
    }

    #[test]
    fn test_create_not_assigned_fails() {
        let (_mock, host) = scripted(&[BEFORE]);
        let ip = IpAddress::new("eth0", "2001:db8::5/64", host);
        let err = TypedResource::create(&ip).unwrap_err();
        assert!(err.to_string().contains("not found after creation"));
    }

    #[test]
    fn test_read_missing_interface_is_gone() {
        let (_mock, host) = scripted(&[BEFORE]);
        let ip = IpAddress::new("eth1", "10.0.0.1/24", host);
        let prior = ip.desired.clone();
        assert_eq!(TypedResource::read(&ip, &prior).unwrap(), None);
    }

    #[test]
    fn test_delete_then_verify() {
        let (mock, host) = scripted(&[AFTER, BEFORE]);
        let ip = IpAddress::new("eth0", "2001:db8::5/64", host);
        let prior = TypedResource::read(&ip, &ip.desired).unwrap().unwrap();

        TypedResource::delete(&ip, &prior).unwrap();
        assert_eq!(
            mock.mutations(),
            vec!["sudo ip addr del 2001:db8::5/64 dev eth0"]
        );
    }

    #[test]
    fn test_import_normalizes() {
        let (_mock, host) = scripted(&[AFTER]);
        let (id, state) = import(&host, "eth0/2001:0db8:0::5/64").unwrap();
        assert_eq!(id, "eth0/2001:db8::5/64");
        assert_eq!(state["address"], "2001:db8::5/64");

        assert!(import(&host, "eth0").is_err());
        assert!(import(&host, "eth0/10.9.9.9/24").is_err());
    }
}
