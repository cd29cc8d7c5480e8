//! `/etc/group` parsing.

use crate::error::{Error, Result};
use crate::parser::{LineParser, ParseState};
use crate::types::GroupRecord;
use regex::Regex;
use std::sync::LazyLock;

pub const READ_COMMAND: &str = "cat /etc/group";

static GROUP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]*):([^:]*):([^:]*):(.*)$").expect("group regex"));

fn group_line(state: &mut ParseState<GroupRecord>, line: &str) -> Result<()> {
    let Some(caps) = GROUP_LINE.captures(line.trim()) else {
        return Ok(());
    };
    let gid = caps[3]
        .parse()
        .map_err(|_| Error::parse("/etc/group", format!("gid '{}' is not a number", &caps[3])))?;

    state.add_item(GroupRecord {
        gid,
        name: caps[1].to_string(),
        members: caps[4]
            .split(',')
            .filter(|member| !member.is_empty())
            .map(str::to_string)
            .collect(),
    });
    Ok(())
}

/// Parse `/etc/group` into records in file order.
///
/// Lines that are not four colon-separated fields are skipped.
pub fn parse_groups(content: &str) -> Result<Vec<GroupRecord>> {
    LineParser::new("/etc/group").handler(group_line).parse(content)
}

/// First group with `gid`.
pub fn by_gid(groups: &[GroupRecord], gid: i64) -> Option<&GroupRecord> {
    groups.iter().find(|g| g.gid == gid)
}

/// First group called `name`.
pub fn by_name<'a>(groups: &'a [GroupRecord], name: &str) -> Option<&'a GroupRecord> {
    groups.iter().find(|g| g.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: &str = "\
root:x:0:
sudo:x:27:alice
docker:x:999:alice,bob
alice:x:1000:
";

    #[test]
    fn test_parse_groups() {
        let groups = parse_groups(GROUP).unwrap();
        assert_eq!(groups.len(), 4);

        let docker = by_name(&groups, "docker").unwrap();
        assert_eq!(docker.gid, 999);
        let members: Vec<_> = docker.members.iter().map(String::as_str).collect();
        assert_eq!(members, vec!["alice", "bob"]);
    }

    #[test]
    fn test_empty_member_list_is_empty_set() {
        let groups = parse_groups("root:x:0:\n").unwrap();
        assert!(groups[0].members.is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse_groups(GROUP).unwrap(), parse_groups(GROUP).unwrap());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let groups = parse_groups("garbage\n\nwheel:x:10:root\n").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(by_gid(&groups, 10).unwrap().name, "wheel");
    }

    #[test]
    fn test_non_numeric_gid_is_parse_error() {
        let err = parse_groups("bad:x:abc:\n").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Parse);
    }

    #[test]
    fn test_large_gid_round_trips() {
        let groups = parse_groups("nogroup:x:4294967294:\n").unwrap();
        assert_eq!(groups[0].gid.to_string(), "4294967294");
    }
}
