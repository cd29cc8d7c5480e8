//! `useradd`/`usermod` and `groupadd`/`groupmod` builders.
//!
//! Builders are append-only. [`UserCommand::finish`] and
//! [`GroupCommand::finish`] consume the builder and append the identity the
//! command acts on, so nothing can be added after it.
//!
//! ```
//! use hostkit::accounts::UserCommand;
//!
//! let command = UserCommand::create()
//!     .uid(1000)
//!     .home_directory("/home/x")
//!     .finish("x");
//! assert_eq!(command.as_str(), "sudo useradd -u 1000 -d '/home/x' -m x");
//! ```

use crate::error::{Error, Result};
use crate::types::Command;
use serde::{Deserialize, Serialize};

/// Builder for `sudo useradd` / `sudo usermod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCommand {
    command: String,
}

impl UserCommand {
    pub fn create() -> Self {
        Self {
            command: "sudo useradd".to_string(),
        }
    }

    pub fn modify() -> Self {
        Self {
            command: "sudo usermod".to_string(),
        }
    }

    pub fn uid(mut self, uid: i64) -> Self {
        self.command.push_str(&format!(" -u {uid}"));
        self
    }

    pub fn gid(mut self, gid: i64) -> Self {
        self.command.push_str(&format!(" -g {gid}"));
        self
    }

    pub fn primary_group(mut self, group: &str) -> Self {
        self.command.push_str(&format!(" -g {group}"));
        self
    }

    /// `-d '<home>' -m`; the home directory is created (or moved) too.
    pub fn home_directory(mut self, home: &str) -> Self {
        self.command.push_str(&format!(" -d '{home}' -m"));
        self
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.command.push_str(&format!(" -s '{shell}'"));
        self
    }

    /// `-l <new>`; only meaningful for `usermod`.
    pub fn rename(mut self, new_username: &str) -> Self {
        self.command.push_str(&format!(" -l {new_username}"));
        self
    }

    /// Close the command with the user it acts on.
    pub fn finish(mut self, current_username: &str) -> Command {
        self.command.push(' ');
        self.command.push_str(current_username);
        Command::new(self.command)
    }
}

/// Builder for `sudo groupadd` / `sudo groupmod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCommand {
    command: String,
}

impl GroupCommand {
    pub fn create() -> Self {
        Self {
            command: "sudo groupadd".to_string(),
        }
    }

    pub fn modify() -> Self {
        Self {
            command: "sudo groupmod".to_string(),
        }
    }

    pub fn gid(mut self, gid: i64) -> Self {
        self.command.push_str(&format!(" -g {gid}"));
        self
    }

    /// `-n <new>`; only meaningful for `groupmod`.
    pub fn rename(mut self, new_name: &str) -> Self {
        self.command.push_str(&format!(" -n {new_name}"));
        self
    }

    pub fn finish(mut self, current_name: &str) -> Command {
        self.command.push(' ');
        self.command.push_str(current_name);
        Command::new(self.command)
    }
}

pub fn delete_user(username: &str) -> Command {
    Command::new(format!("sudo userdel {username}"))
}

pub fn delete_group(name: &str) -> Command {
    Command::new(format!("sudo groupdel {name}"))
}

/// Desired user attributes. Unset fields are left to the host's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserSpec {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl UserSpec {
    /// `gid` and `primary_group` name the same thing; only one may be set.
    pub fn validate(&self) -> Result<()> {
        if self.gid.is_some() && self.primary_group.is_some() {
            return Err(Error::validation(
                "Group overdefined",
                format!(
                    "user '{}': you may only define changes for gid or primary_group, not both",
                    self.username
                ),
            ));
        }
        Ok(())
    }

    /// Build the command for this spec.
    ///
    /// With `current_username` this is a `usermod` that renames the user when
    /// the names differ; without it a `useradd`. Every set field is passed
    /// through, so callers updating a user should clear unchanged fields
    /// first (see [`UserSpec::changes_from`]).
    pub fn command(&self, current_username: Option<&str>) -> Command {
        let mut builder = match current_username {
            Some(_) => UserCommand::modify(),
            None => UserCommand::create(),
        };
        if let Some(uid) = self.uid {
            builder = builder.uid(uid);
        }
        if let Some(gid) = self.gid {
            builder = builder.gid(gid);
        }
        if let Some(group) = &self.primary_group {
            builder = builder.primary_group(group);
        }
        if let Some(home) = &self.home_directory {
            builder = builder.home_directory(home);
        }
        if let Some(shell) = &self.shell {
            builder = builder.shell(shell);
        }
        match current_username {
            Some(current) if current != self.username => {
                builder.rename(&self.username).finish(current)
            }
            Some(current) => builder.finish(current),
            None => builder.finish(&self.username),
        }
    }

    /// Copy of `self` keeping only the fields that differ from `prior`.
    ///
    /// Changing both the username and the uid in one step is rejected: there
    /// would be nothing left to identify the existing user by.
    pub fn changes_from(&self, prior: &UserSpec) -> Result<UserSpec> {
        self.validate()?;
        let renamed = self.username != prior.username;
        let uid_changed = self.uid.is_some() && self.uid != prior.uid;
        if renamed && uid_changed {
            return Err(Error::validation(
                "User identity overdefined",
                format!(
                    "user '{}' -> '{}': changing the username and the uid in the same step means \
                     there is no link to the original user",
                    prior.username, self.username
                ),
            ));
        }

        fn changed<T: Clone + PartialEq>(new: &Option<T>, old: &Option<T>) -> Option<T> {
            if new == old { None } else { new.clone() }
        }

        Ok(UserSpec {
            username: self.username.clone(),
            uid: changed(&self.uid, &prior.uid),
            gid: changed(&self.gid, &prior.gid),
            primary_group: changed(&self.primary_group, &prior.primary_group),
            home_directory: changed(&self.home_directory, &prior.home_directory),
            shell: changed(&self.shell, &prior.shell),
        })
    }
}

/// Desired group attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<i64>,
}

impl GroupSpec {
    /// `groupadd` without a current name, `groupmod` (renaming if needed) with one.
    pub fn command(&self, current_name: Option<&str>) -> Command {
        let mut builder = match current_name {
            Some(_) => GroupCommand::modify(),
            None => GroupCommand::create(),
        };
        if let Some(gid) = self.gid {
            builder = builder.gid(gid);
        }
        match current_name {
            Some(current) if current != self.name => builder.rename(&self.name).finish(current),
            Some(current) => builder.finish(current),
            None => builder.finish(&self.name),
        }
    }

    /// Copy of `self` keeping the gid only when it changed.
    pub fn changes_from(&self, prior: &GroupSpec) -> GroupSpec {
        GroupSpec {
            name: self.name.clone(),
            gid: if self.gid == prior.gid { None } else { self.gid },
        }
    }
}
