//! Shared handle to one managed host.

use crate::accounts::{groups, users};
use crate::backend::Executor;
use crate::backend::local::LocalExecutor;
use crate::backend::ssh::{SshConfig, SshExecutor};
use crate::certs;
use crate::error::{Error, Result};
use crate::net::{self, Adapters, dhcp};
use crate::types::{CertificateRecord, Command, GroupRecord, UserRecord};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

struct HostData {
    executor: Box<dyn Executor>,
    adapters: Option<Adapters>,
    hostname: Option<String>,
}

/// A host plus its cached facts.
///
/// The executor and the caches sit behind one mutex: commands never overlap
/// on the same host, and a mutating command clears the adapter cache before
/// the lock is released. Resource drivers running on several threads share
/// one `Host` by reference.
pub struct Host {
    inner: Mutex<HostData>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").field("target", &self.target()).finish()
    }
}

impl Host {
    /// Manage a remote host through the system `ssh` client.
    pub fn ssh(config: SshConfig) -> Self {
        Self::with_executor(Box::new(SshExecutor::new(config)))
    }

    /// Manage the machine this process runs on.
    pub fn local() -> Self {
        Self::with_executor(Box::new(LocalExecutor::new()))
    }

    /// Use a custom executor (useful for testing).
    pub fn with_executor(executor: Box<dyn Executor>) -> Self {
        Self {
            inner: Mutex::new(HostData {
                executor,
                adapters: None,
                hostname: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostData> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn target(&self) -> String {
        self.lock().executor.target()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Run a read-only command. Caches are left alone.
    pub fn query(&self, command: &str) -> Result<String> {
        self.lock().executor.execute(command)
    }

    /// Run a mutating command and invalidate the adapter cache.
    ///
    /// The cache is cleared even when the command fails, since it may have
    /// taken partial effect.
    pub fn run(&self, command: &Command) -> Result<String> {
        let mut data = self.lock();
        log::info!("{}: {}", data.executor.target(), command);
        let result = data.executor.execute(command.as_str());
        data.adapters = None;
        result
    }

    /// Run commands in order, stopping at the first failure.
    pub fn run_all(&self, commands: &[Command]) -> Result<()> {
        for command in commands {
            self.run(command)?;
        }
        Ok(())
    }

    // =========================================================================
    // Facts
    // =========================================================================

    /// Adapters with dhclient state, from cache when still valid.
    pub fn adapters(&self) -> Result<Adapters> {
        let mut data = self.lock();
        if let Some(cached) = &data.adapters {
            return Ok(cached.clone());
        }
        let adapters = Self::read_adapters(&*data.executor)?;
        data.adapters = Some(adapters.clone());
        Ok(adapters)
    }

    /// Drop the adapter cache and read again.
    pub fn refresh_adapters(&self) -> Result<Adapters> {
        self.lock().adapters = None;
        self.adapters()
    }

    fn read_adapters(executor: &dyn Executor) -> Result<Adapters> {
        let output = executor.execute(net::READ_COMMAND)?;
        let mut adapters = net::parse_adapters(&output)?;

        // grep exits 1 with no output when nothing matches
        let ps_output = match executor.execute(dhcp::PS_COMMAND) {
            Ok(output) => output,
            Err(Error::Transport { output, .. }) if output.trim().is_empty() => String::new(),
            Err(e) => return Err(e),
        };
        dhcp::correlate_dhclient(&mut adapters, &ps_output);
        Ok(adapters)
    }

    /// Trimmed `hostname` output, read once.
    pub fn hostname(&self) -> Result<String> {
        let mut data = self.lock();
        if let Some(hostname) = &data.hostname {
            return Ok(hostname.clone());
        }
        let hostname = data.executor.execute("hostname")?.trim().to_string();
        data.hostname = Some(hostname.clone());
        Ok(hostname)
    }

    pub fn groups(&self) -> Result<Vec<GroupRecord>> {
        let content = self.query(groups::READ_COMMAND)?;
        groups::parse_groups(&content)
    }

    /// Users correlated with the current group table.
    pub fn users(&self) -> Result<Vec<UserRecord>> {
        let all_groups = self.groups()?;
        let passwd = self.query(users::READ_COMMAND)?;
        let hostname = self.hostname()?;
        users::parse_users(&passwd, &all_groups, &hostname)
    }

    /// Certificates in the system trust bundle.
    pub fn certificates(&self) -> Result<Vec<CertificateRecord>> {
        let bundle = self.query(certs::READ_COMMAND)?;
        Ok(certs::parse_bundle(&bundle))
    }
}
