//! Network interface facts and commands.

pub mod adapters;
pub mod dhcp;
pub mod link;

pub use adapters::{Adapters, parse_adapters};
pub use link::{LinkCommon, LinkSpec, LinkState};

/// Lists every link with details and addresses.
pub const READ_COMMAND: &str = "ip -d a";
