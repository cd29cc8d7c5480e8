//! Local users and groups.

pub mod command;
pub mod groups;
pub mod users;

pub use command::{GroupCommand, GroupSpec, UserCommand, UserSpec, delete_group, delete_user};
pub use groups::parse_groups;
pub use users::parse_users;
