//! `/etc/group` entries

use anyhow::{Result, bail};
use declarative::{Change, ChangeSet, StateEntry, TypedResource};
use hostkit::accounts::{GroupSpec, delete_group, groups};
use hostkit::{GroupRecord, Host};
use serde_json::Value;
use std::sync::Arc;

use super::{STAGE_GROUP, not_created, still_present, stored, to_value};

pub const TYPE: &str = "group";

/// A group, matched on the host by gid or name
#[derive(Debug)]
pub struct Group {
    id: String,
    spec: GroupSpec,
    host: Arc<Host>,
}

/// First group whose name is `name` or whose gid is `gid`
fn find<'a>(all: &'a [GroupRecord], name: &str, gid: Option<i64>) -> Option<&'a GroupRecord> {
    all.iter().find(|g| g.name == name || Some(g.gid) == gid)
}

impl Group {
    pub fn new(id: &str, spec: GroupSpec, host: Arc<Host>) -> Self {
        Self {
            id: id.to_string(),
            spec,
            host,
        }
    }

    pub fn from_entry(entry: &StateEntry, host: Arc<Host>) -> Result<Self> {
        let record: GroupRecord = stored(entry)?;
        Ok(Self::new(
            &entry.id,
            GroupSpec {
                name: record.name,
                gid: Some(record.gid),
            },
            host,
        ))
    }

    fn read_back(&self) -> Result<GroupRecord> {
        let all = self.host.groups()?;
        match find(&all, &self.spec.name, self.spec.gid) {
            Some(group) => Ok(group.clone()),
            None => Err(not_created(TYPE, &self.spec.name).into()),
        }
    }
}

impl TypedResource for Group {
    type State = GroupRecord;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        match self.spec.gid {
            Some(gid) => format!("Group {} (gid {gid})", self.spec.name),
            None => format!("Group {}", self.spec.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn stage(&self) -> u8 {
        STAGE_GROUP
    }

    fn create(&self) -> Result<GroupRecord> {
        self.host.run(&self.spec.command(None))?;
        self.read_back()
    }

    fn read(&self, prior: &GroupRecord) -> Result<Option<GroupRecord>> {
        let all = self.host.groups()?;
        Ok(find(&all, &prior.name, Some(prior.gid)).cloned())
    }

    fn compare(&self, live: &GroupRecord) -> Result<Change> {
        let mut changes = ChangeSet::new().update(
            "name",
            Some(live.name.as_str()),
            Some(self.spec.name.as_str()),
        );
        if let Some(gid) = self.spec.gid {
            changes = changes.update("gid", Some(&live.gid), Some(&gid));
        }
        Ok(changes.finish())
    }

    fn update(&self, prior: &GroupRecord) -> Result<GroupRecord> {
        let current = GroupSpec {
            name: prior.name.clone(),
            gid: Some(prior.gid),
        };
        let delta = self.spec.changes_from(&current);
        if delta.gid.is_some() || delta.name != prior.name {
            self.host.run(&delta.command(Some(&prior.name)))?;
        }
        self.read_back()
    }

    fn delete(&self, prior: &GroupRecord) -> Result<()> {
        self.host.run(&delete_group(&prior.name))?;
        let all = self.host.groups()?;
        if find(&all, &prior.name, Some(prior.gid)).is_some() {
            return Err(still_present(TYPE, &prior.name).into());
        }
        Ok(())
    }
}

/// Adopt the group named `key`
pub fn import(host: &Host, key: &str) -> Result<(String, Value)> {
    let all = host.groups()?;
    match groups::by_name(&all, key) {
        Some(group) => Ok((key.to_string(), to_value(group)?)),
        None => bail!("No group named '{key}' on {}", host.target()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use hostkit::backend::MockExecutor;
    use hostkit::ErrorCategory;

    const GROUPS: &str = "root:x:0:\nusers:x:100:\n";

    fn devs(gid: Option<i64>, host: Arc<Host>) -> Group {
        Group::new(
            "devs",
            GroupSpec {
                name: "devs".into(),
                gid,
            },
            host,
        )
    }

    fn category(err: &anyhow::Error) -> Option<ErrorCategory> {
        err.downcast_ref::<hostkit::Error>().map(hostkit::Error::category)
    }

    #[test]
    fn test_create_reads_back() {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, format!("{GROUPS}devs:x:2000:alice\n"));
        let group = devs(Some(2000), testing::host(&mock));

        let record = TypedResource::create(&group).unwrap();
        assert_eq!(record.gid, 2000);
        assert!(record.members.contains("alice"));
        assert_eq!(mock.mutations(), vec!["sudo groupadd -g 2000 devs"]);
    }

    #[test]
    fn test_create_missing_afterwards_fails() {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, GROUPS);
        let group = devs(None, testing::host(&mock));

        let err = TypedResource::create(&group).unwrap_err();
        assert_eq!(category(&err), Some(ErrorCategory::Reconciliation));
        assert!(err.to_string().contains("not found after creation"));
    }

    #[test]
    fn test_read_matches_gid_after_outside_rename() {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, format!("{GROUPS}developers:x:2000:\n"));
        let group = devs(Some(2000), testing::host(&mock));

        let prior = GroupRecord {
            gid: 2000,
            name: "devs".into(),
            members: Default::default(),
        };
        let live = TypedResource::read(&group, &prior).unwrap().unwrap();
        assert_eq!(live.name, "developers");

        let change = TypedResource::compare(&group, &live).unwrap();
        assert!(matches!(change, Change::Update(ref f) if f[0].field == "name"));
    }

    #[test]
    fn test_update_renames_by_prior_name() {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, format!("{GROUPS}devs:x:2000:\n"));
        let group = devs(Some(2000), testing::host(&mock));

        let prior = GroupRecord {
            gid: 2000,
            name: "developers".into(),
            members: Default::default(),
        };
        TypedResource::update(&group, &prior).unwrap();
        assert_eq!(mock.mutations(), vec!["sudo groupmod -n devs developers"]);
    }

    #[test]
    fn test_delete_still_present_fails() {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, format!("{GROUPS}devs:x:2000:\n"));
        let group = devs(None, testing::host(&mock));
        let prior = GroupRecord {
            gid: 2000,
            name: "devs".into(),
            members: Default::default(),
        };

        let err = TypedResource::delete(&group, &prior).unwrap_err();
        assert!(err.to_string().contains("remains present"));
        assert_eq!(mock.mutations(), vec!["sudo groupdel devs"]);
    }

    #[test]
    fn test_import_and_rehydrate() {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, format!("{GROUPS}devs:x:2000:bob\n"));
        let host = testing::host(&mock);

        let (id, state) = import(&host, "devs").unwrap();
        assert_eq!(id, "devs");
        assert_eq!(state["gid"], 2000);
        assert!(import(&host, "nope").is_err());

        let entry = StateEntry {
            resource_type: TYPE.into(),
            id,
            state,
        };
        let group = Group::from_entry(&entry, host).unwrap();
        assert_eq!(group.spec.gid, Some(2000));
    }
}
