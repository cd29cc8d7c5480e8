//! Resource drivers: one [`TypedResource`](declarative::TypedResource) per
//! kind of host object.
//!
//! Every driver follows the same lifecycle. Create runs the commands, then
//! reads the host back and requires the object to be there. Read looks the
//! object up by its key. Update is rename-aware and re-reads like create.
//! Delete runs the removal and requires the object to be gone.

use anyhow::{Result, bail};
use declarative::{BoxedResource, StateEntry};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Manifest;
use hostkit::Host;

pub mod ca_certificate;
pub mod group;
pub mod interface;
pub mod ip_address;
pub mod user;

pub use ca_certificate::CaCertificate;
pub use group::Group;
pub use interface::Interface;
pub use ip_address::IpAddress;
pub use user::User;

// Stages: lower stages are created first and deleted last.
pub const STAGE_CA_CERTIFICATE: u8 = 0;
pub const STAGE_GROUP: u8 = 0;
pub const STAGE_USER: u8 = 1;
pub const STAGE_BRIDGE: u8 = 2;
pub const STAGE_LINK: u8 = 3;
pub const STAGE_STACKED_LINK: u8 = 4;
pub const STAGE_IP_ADDRESS: u8 = 5;

/// Every resource type name, for help text and import
pub const RESOURCE_TYPES: &[&str] = &[
    group::TYPE,
    user::TYPE,
    interface::TYPE,
    ip_address::TYPE,
    ca_certificate::TYPE,
];

/// Desired resources declared by a manifest
pub fn desired(manifest: &Manifest, host: &Arc<Host>) -> Result<Vec<BoxedResource>> {
    let mut resources: Vec<BoxedResource> = Vec::with_capacity(manifest.resource_count());

    for group in &manifest.groups {
        resources.push(Box::new(Group::new(
            group.address_id(),
            group.spec.clone(),
            Arc::clone(host),
        )));
    }
    for user in &manifest.users {
        resources.push(Box::new(User::new(
            user.address_id(),
            user.spec.clone(),
            Arc::clone(host),
        )));
    }
    for link in &manifest.interfaces {
        resources.push(Box::new(Interface::new(link.clone(), Arc::clone(host))));
    }
    for ip in &manifest.ip_addresses {
        resources.push(Box::new(IpAddress::new(
            &ip.interface,
            &ip.address,
            Arc::clone(host),
        )));
    }
    for cert in &manifest.ca_certificates {
        resources.push(Box::new(CaCertificate::new(
            &cert.name,
            &cert.content()?,
            Arc::clone(host),
        )?));
    }

    Ok(resources)
}

/// Turn a stored entry back into a resource that can read or delete it
pub fn rehydrate(entry: &StateEntry, host: &Arc<Host>) -> Result<BoxedResource> {
    let host = Arc::clone(host);
    let resource: BoxedResource = match entry.resource_type.as_str() {
        group::TYPE => Box::new(Group::from_entry(entry, host)?),
        user::TYPE => Box::new(User::from_entry(entry, host)?),
        interface::TYPE => Box::new(Interface::from_entry(entry, host)?),
        ip_address::TYPE => Box::new(IpAddress::from_entry(entry, host)?),
        ca_certificate::TYPE => Box::new(CaCertificate::from_entry(entry, host)?),
        other => bail!("Unknown resource type '{other}' in state ({})", entry.address()),
    };
    Ok(resource)
}

/// Look up a live object by its import key; returns its id and state
pub fn import(host: &Host, resource_type: &str, key: &str) -> Result<(String, Value)> {
    match resource_type {
        group::TYPE => group::import(host, key),
        user::TYPE => user::import(host, key),
        interface::TYPE => interface::import(host, key),
        ip_address::TYPE => ip_address::import(host, key),
        ca_certificate::TYPE => ca_certificate::import(host, key),
        other => bail!(
            "Unknown resource type '{other}' (expected one of: {})",
            RESOURCE_TYPES.join(", ")
        ),
    }
}

/// Decode a stored state value for `entry`
pub(crate) fn stored<T: serde::de::DeserializeOwned>(entry: &StateEntry) -> Result<T> {
    use anyhow::Context;

    T::deserialize(&entry.state)
        .with_context(|| format!("Invalid stored state for {}", entry.address()))
}

pub(crate) fn to_value<T: Serialize>(state: &T) -> Result<Value> {
    use anyhow::Context;

    serde_json::to_value(state).context("Failed to serialize resource state")
}

pub(crate) fn not_created(resource_type: &str, id: &str) -> hostkit::Error {
    hostkit::Error::NotCreated {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}

pub(crate) fn still_present(resource_type: &str, id: &str) -> hostkit::Error {
    hostkit::Error::StillPresent {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use hostkit::backend::MockExecutor;
    use serde_json::json;

    #[test]
    fn test_rehydrate_unknown_type() {
        let host = testing::host(&MockExecutor::new());
        let entry = StateEntry {
            resource_type: "printer".into(),
            id: "lp0".into(),
            state: json!({}),
        };
        let err = rehydrate(&entry, &host).unwrap_err();
        assert!(err.to_string().contains("printer"));
    }

    #[test]
    fn test_import_unknown_type_lists_types() {
        let host = Host::with_executor(Box::new(MockExecutor::new()));
        let err = import(&host, "printer", "lp0").unwrap_err();
        assert!(err.to_string().contains("ca_certificate"));
    }
}
