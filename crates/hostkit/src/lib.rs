//! # hostkit
//!
//! Read and converge the state of a Linux host through a shell command
//! channel.
//!
//! This crate provides functionality for:
//! - Parsing `ip -d a` into adapter records (addresses, vlan/vxlan/bridge facts)
//! - Overlaying dhclient process state onto those records
//! - Parsing `/etc/passwd` and `/etc/group` and resolving group membership
//! - Parsing PEM trust bundles into fingerprinted certificate records
//! - Building `ip link`, `useradd`/`usermod`, `groupadd`/`groupmod` commands
//!
//! ## Example
//!
//! ```
//! use hostkit::Host;
//! use hostkit::backend::MockExecutor;
//!
//! let mock = MockExecutor::new();
//! mock.respond(
//!     "ip -d a",
//!     "1: eth0: <BROADCAST,MULTICAST,UP> mtu 1500 state UP\n    inet 10.0.0.5/24\n",
//! );
//!
//! let host = Host::with_executor(Box::new(mock));
//! let adapters = host.adapters().unwrap();
//! assert!(adapters.by_name("eth0").unwrap().has_address("10.0.0.5/24"));
//! ```
//!
//! Against a real machine use [`Host::ssh`] or [`Host::local`].

#![warn(clippy::all)]

pub mod accounts;
pub mod backend;
pub mod certs;
pub mod error;
pub mod files;
pub mod host;
pub mod net;
pub mod parser;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use host::Host;
pub use types::{
    AdapterKind, AdapterRecord, CertificateRecord, Command, GroupRecord, IpWithPrefix, UserRecord,
};
