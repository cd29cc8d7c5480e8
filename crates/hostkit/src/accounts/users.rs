//! `/etc/passwd` parsing and correlation with the group table.

use crate::accounts::groups;
use crate::error::{Error, Result};
use crate::parser::{LineParser, ParseState};
use crate::types::{GroupRecord, UserRecord};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const READ_COMMAND: &str = "cat /etc/passwd";

static PASSWD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^:]*):([^:]*):([^:]*):([^:]*):([^:]*):([^:]*):([^:]*)").expect("passwd regex")
});

/// The user's full group set: the primary group plus every group listing
/// the user as a member. The primary group is never listed twice.
pub fn group_names(all: &[GroupRecord], username: &str, primary_group: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::from([primary_group.to_string()]);
    for group in all {
        if !group.members.contains(username) || group.name == primary_group {
            continue;
        }
        names.insert(group.name.clone());
    }
    names
}

fn number(field: &str, what: &str) -> Result<i64> {
    field
        .parse()
        .map_err(|_| Error::parse("/etc/passwd", format!("{what} '{field}' is not a number")))
}

/// Parse `/etc/passwd`, resolving each primary GID against `all`.
///
/// A GID with no group is an [`Error::UnresolvedGid`]; no user is produced
/// with a made-up group name.
pub fn parse_users(passwd: &str, all: &[GroupRecord], hostname: &str) -> Result<Vec<UserRecord>> {
    let user_line = |state: &mut ParseState<UserRecord>, line: &str| -> Result<()> {
        let Some(caps) = PASSWD_LINE.captures(line.trim()) else {
            return Ok(());
        };
        let username = caps[1].to_string();
        let uid = number(&caps[3], "uid")?;
        let gid = number(&caps[4], "gid")?;

        let primary_group = groups::by_gid(all, gid)
            .map(|g| g.name.clone())
            .ok_or_else(|| Error::UnresolvedGid {
                username: username.clone(),
                gid,
            })?;

        state.add_item(UserRecord {
            groups: group_names(all, &username, &primary_group),
            username,
            uid,
            gid,
            primary_group,
            home_directory: caps[6].to_string(),
            shell: caps[7].to_string(),
            hostname: hostname.to_string(),
        });
        Ok(())
    };

    LineParser::new("/etc/passwd").handler(user_line).parse(passwd)
}

/// First user matching `username` or `uid`.
pub fn find<'a>(users: &'a [UserRecord], username: &str, uid: Option<i64>) -> Option<&'a UserRecord> {
    users
        .iter()
        .find(|u| u.username == username || Some(u.uid) == uid)
}
