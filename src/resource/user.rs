//! `/etc/passwd` users

use anyhow::{Result, bail};
use declarative::{Change, ChangeSet, StateEntry, TypedResource};
use hostkit::accounts::{UserSpec, delete_user, users};
use hostkit::{Host, UserRecord};
use serde_json::Value;
use std::sync::Arc;

use super::{STAGE_USER, not_created, still_present, stored, to_value};

pub const TYPE: &str = "user";

/// A user account, matched on the host by username or uid
#[derive(Debug)]
pub struct User {
    id: String,
    spec: UserSpec,
    host: Arc<Host>,
}

/// The live record as a fully specified spec
fn live_spec(record: &UserRecord) -> UserSpec {
    UserSpec {
        username: record.username.clone(),
        uid: Some(record.uid),
        gid: Some(record.gid),
        primary_group: Some(record.primary_group.clone()),
        home_directory: Some(record.home_directory.clone()),
        shell: Some(record.shell.clone()),
    }
}

fn is_noop(delta: &UserSpec, current_username: &str) -> bool {
    delta.username == current_username
        && delta.uid.is_none()
        && delta.gid.is_none()
        && delta.primary_group.is_none()
        && delta.home_directory.is_none()
        && delta.shell.is_none()
}

impl User {
    pub fn new(id: &str, spec: UserSpec, host: Arc<Host>) -> Self {
        Self {
            id: id.to_string(),
            spec,
            host,
        }
    }

    pub fn from_entry(entry: &StateEntry, host: Arc<Host>) -> Result<Self> {
        let record: UserRecord = stored(entry)?;
        let spec = UserSpec {
            username: record.username,
            uid: Some(record.uid),
            ..Default::default()
        };
        Ok(Self::new(&entry.id, spec, host))
    }

    fn read_back(&self) -> Result<UserRecord> {
        let all = self.host.users()?;
        match users::find(&all, &self.spec.username, self.spec.uid) {
            Some(user) => Ok(user.clone()),
            None => Err(not_created(TYPE, &self.spec.username).into()),
        }
    }
}

impl TypedResource for User {
    type State = UserRecord;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        match self.spec.uid {
            Some(uid) => format!("User {} (uid {uid})", self.spec.username),
            None => format!("User {}", self.spec.username),
        }
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn stage(&self) -> u8 {
        STAGE_USER
    }

    fn create(&self) -> Result<UserRecord> {
        self.spec.validate()?;
        self.host.run(&self.spec.command(None))?;
        self.read_back()
    }

    fn read(&self, prior: &UserRecord) -> Result<Option<UserRecord>> {
        let all = self.host.users()?;
        Ok(users::find(&all, &prior.username, Some(prior.uid)).cloned())
    }

    fn compare(&self, live: &UserRecord) -> Result<Change> {
        let delta = self.spec.changes_from(&live_spec(live))?;
        Ok(ChangeSet::new()
            .update(
                "username",
                Some(live.username.as_str()),
                Some(self.spec.username.as_str()),
            )
            .update("uid", delta.uid.map(|_| &live.uid), delta.uid.as_ref())
            .update("gid", delta.gid.map(|_| &live.gid), delta.gid.as_ref())
            .update(
                "primary_group",
                delta
                    .primary_group
                    .as_ref()
                    .map(|_| live.primary_group.as_str()),
                delta.primary_group.as_deref(),
            )
            .update(
                "home_directory",
                delta
                    .home_directory
                    .as_ref()
                    .map(|_| live.home_directory.as_str()),
                delta.home_directory.as_deref(),
            )
            .update(
                "shell",
                delta.shell.as_ref().map(|_| live.shell.as_str()),
                delta.shell.as_deref(),
            )
            .finish())
    }

    fn update(&self, prior: &UserRecord) -> Result<UserRecord> {
        let delta = self.spec.changes_from(&live_spec(prior))?;
        if !is_noop(&delta, &prior.username) {
            self.host.run(&delta.command(Some(&prior.username)))?;
        }
        self.read_back()
    }

    fn delete(&self, prior: &UserRecord) -> Result<()> {
        self.host.run(&delete_user(&prior.username))?;
        let all = self.host.users()?;
        if users::find(&all, &prior.username, Some(prior.uid)).is_some() {
            return Err(still_present(TYPE, &prior.username).into());
        }
        Ok(())
    }
}

/// Adopt the user named `key`
pub fn import(host: &Host, key: &str) -> Result<(String, Value)> {
    let all = host.users()?;
    match users::find(&all, key, None) {
        Some(user) => Ok((key.to_string(), to_value(user)?)),
        None => bail!("No user named '{key}' on {}", host.target()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use hostkit::accounts::groups;
    use hostkit::backend::MockExecutor;

    const GROUPS: &str = "root:x:0:\ndevs:x:2000:\ndocker:x:999:alice\n";
    const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n";

    fn scripted(passwd: &str) -> MockExecutor {
        let mock = MockExecutor::new();
        mock.respond(groups::READ_COMMAND, GROUPS)
            .respond("hostname", "web-01\n")
            .respond(users::READ_COMMAND, format!("{PASSWD}{passwd}"));
        mock
    }

    fn alice(host: Arc<Host>) -> User {
        User::new(
            "alice",
            UserSpec {
                username: "alice".into(),
                uid: Some(1500),
                primary_group: Some("devs".into()),
                shell: Some("/bin/bash".into()),
                ..Default::default()
            },
            host,
        )
    }

    const ALICE: &str = "alice:x:1500:2000:Alice:/home/alice:/bin/bash\n";

    #[test]
    fn test_create_reads_back_with_groups() {
        let mock = scripted(ALICE);
        let user = alice(testing::host(&mock));

        let record = TypedResource::create(&user).unwrap();
        assert_eq!(record.primary_group, "devs");
        assert!(record.groups.contains("docker"));
        assert_eq!(record.hostname, "web-01");
        assert_eq!(
            mock.mutations(),
            vec!["sudo useradd -u 1500 -g devs -s '/bin/bash' alice"]
        );
    }

    #[test]
    fn test_compare_only_declared_fields() {
        let mock = scripted(ALICE);
        let user = alice(testing::host(&mock));
        let live = TypedResource::create(&user).unwrap();
        assert_eq!(TypedResource::compare(&user, &live).unwrap(), Change::NoChange);

        let drifted = UserRecord {
            shell: "/bin/sh".into(),
            home_directory: "/srv/alice".into(),
            ..live
        };
        let change = TypedResource::compare(&user, &drifted).unwrap();
        let fields: Vec<_> = change.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["shell"]);
    }

    #[test]
    fn test_rename_with_uid_change_is_rejected() {
        let mock = scripted("");
        let user = alice(testing::host(&mock));
        let live = UserRecord {
            username: "alicia".into(),
            uid: 1400,
            gid: 2000,
            primary_group: "devs".into(),
            groups: Default::default(),
            home_directory: "/home/alicia".into(),
            shell: "/bin/bash".into(),
            hostname: "web-01".into(),
        };
        let err = TypedResource::compare(&user, &live).unwrap_err();
        assert!(err.to_string().contains("User identity overdefined"));
    }

    #[test]
    fn test_update_renames_with_usermod() {
        let mock = scripted(ALICE);
        let user = alice(testing::host(&mock));
        let prior = UserRecord {
            username: "alicia".into(),
            uid: 1500,
            gid: 2000,
            primary_group: "devs".into(),
            groups: Default::default(),
            home_directory: "/home/alice".into(),
            shell: "/bin/bash".into(),
            hostname: "web-01".into(),
        };

        let record = TypedResource::update(&user, &prior).unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(mock.mutations(), vec!["sudo usermod -l alice alicia"]);
    }

    #[test]
    fn test_unresolved_gid_surfaces() {
        let mock = scripted("ghost:x:1600:4242::/home/ghost:/bin/sh\n");
        let host = testing::host(&mock);
        let err = import(&host, "ghost").unwrap_err();
        let host_err = err.downcast_ref::<hostkit::Error>().unwrap();
        assert_eq!(host_err.category(), hostkit::ErrorCategory::UnresolvedReference);
    }

    #[test]
    fn test_delete_then_verify_absent() {
        let mock = scripted("");
        let user = alice(testing::host(&mock));
        let prior = UserRecord {
            username: "alice".into(),
            uid: 1500,
            gid: 2000,
            primary_group: "devs".into(),
            groups: Default::default(),
            home_directory: "/home/alice".into(),
            shell: "/bin/bash".into(),
            hostname: "web-01".into(),
        };
        TypedResource::delete(&user, &prior).unwrap();
        assert_eq!(mock.mutations(), vec!["sudo userdel alice"]);
    }

    #[test]
    fn test_rehydrated_user_reads_by_uid() {
        let mock = scripted("alice2:x:1500:2000::/home/alice:/bin/bash\n");
        let host = testing::host(&mock);
        let entry = StateEntry {
            resource_type: TYPE.into(),
            id: "alice".into(),
            state: serde_json::json!({
                "username": "alice", "uid": 1500, "gid": 2000, "primary_group": "devs",
                "groups": ["devs"], "home_directory": "/home/alice", "shell": "/bin/bash",
                "hostname": "web-01"
            }),
        };
        let user = User::from_entry(&entry, host).unwrap();
        let prior: UserRecord = stored(&entry).unwrap();
        let live = TypedResource::read(&user, &prior).unwrap().unwrap();
        assert_eq!(live.username, "alice2");
    }
}
