//! CA certificates in the system trust bundle
//!
//! A certificate is identified on the host by its SHA-256 fingerprint in
//! the bundle that `update-ca-certificates` builds, not by the file it was
//! installed from.

use anyhow::{Context, Result, anyhow, bail};
use declarative::{Change, ChangeSet, StateEntry, TypedResource};
use hostkit::certs::{
    by_fingerprint, decode_hex_colon, encode_hex_colon, install_commands, install_path,
    parse_certificate, remove_commands,
};
use hostkit::{CertificateRecord, Host};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{STAGE_CA_CERTIFICATE, not_created, still_present, stored, to_value};

pub const TYPE: &str = "ca_certificate";

/// Stored state, with binary fields in `ab:cd` form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaCertificateRecord {
    pub name: String,
    pub fingerprint_sha256: String,
    pub serial_number: String,
    pub subject: String,
    pub pem: String,
}

impl CaCertificateRecord {
    fn new(name: &str, cert: &CertificateRecord) -> Self {
        Self {
            name: name.to_string(),
            fingerprint_sha256: encode_hex_colon(&cert.fingerprint),
            serial_number: encode_hex_colon(&cert.serial_number),
            subject: cert.subject.clone(),
            pem: cert.pem.clone(),
        }
    }
}

fn fingerprint(text: &str) -> Result<[u8; 32]> {
    decode_hex_colon(text)?
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("Fingerprint '{text}' is {} bytes, expected 32", bytes.len()))
}

#[derive(Debug)]
pub struct CaCertificate {
    name: String,
    cert: CertificateRecord,
    host: Arc<Host>,
}

impl CaCertificate {
    /// Fails when `content` holds no parseable certificate
    pub fn new(name: &str, content: &str, host: Arc<Host>) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            cert: parse_certificate(content)?,
            host,
        })
    }

    pub fn from_entry(entry: &StateEntry, host: Arc<Host>) -> Result<Self> {
        let record: CaCertificateRecord = stored(entry)?;
        let cert = parse_certificate(&record.pem)
            .with_context(|| format!("Invalid stored certificate for {}", entry.address()))?;
        Ok(Self {
            name: record.name,
            cert,
            host,
        })
    }

    fn lookup(&self, fingerprint: &[u8; 32]) -> Result<Option<CertificateRecord>> {
        let bundle = self.host.certificates()?;
        Ok(by_fingerprint(&bundle, fingerprint).cloned())
    }

    fn install(&self) -> Result<CaCertificateRecord> {
        self.host.run_all(&install_commands(&self.name, &self.cert))?;
        match self.lookup(&self.cert.fingerprint)? {
            Some(cert) => Ok(CaCertificateRecord::new(&self.name, &cert)),
            None => Err(not_created(TYPE, &self.name).into()),
        }
    }
}

impl TypedResource for CaCertificate {
    type State = CaCertificateRecord;

    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("CA certificate {}", install_path(&self.name))
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn stage(&self) -> u8 {
        STAGE_CA_CERTIFICATE
    }

    // update-ca-certificates rebuilds one shared bundle
    fn can_parallelize(&self) -> bool {
        false
    }

    fn create(&self) -> Result<CaCertificateRecord> {
        self.install()
    }

    fn read(&self, prior: &CaCertificateRecord) -> Result<Option<CaCertificateRecord>> {
        let stored = fingerprint(&prior.fingerprint_sha256)?;
        Ok(self
            .lookup(&stored)?
            .map(|cert| CaCertificateRecord::new(&prior.name, &cert)))
    }

    fn compare(&self, live: &CaCertificateRecord) -> Result<Change> {
        let desired = encode_hex_colon(&self.cert.fingerprint);
        Ok(ChangeSet::new()
            .replace(
                "fingerprint_sha256",
                Some(live.fingerprint_sha256.as_str()),
                Some(desired.as_str()),
            )
            .finish())
    }

    fn update(&self, _prior: &CaCertificateRecord) -> Result<CaCertificateRecord> {
        self.install()
    }

    fn delete(&self, prior: &CaCertificateRecord) -> Result<()> {
        self.host.run_all(&remove_commands(&prior.name))?;
        if self.lookup(&fingerprint(&prior.fingerprint_sha256)?)?.is_some() {
            return Err(still_present(TYPE, &prior.name).into());
        }
        Ok(())
    }
}

/// Adopt `<name>:<fingerprint>` from the bundle, or `<name>` from its
/// installed file
pub fn import(host: &Host, key: &str) -> Result<(String, Value)> {
    let record = match key.split_once(':') {
        Some((name, fp)) => {
            let bundle = host.certificates()?;
            match by_fingerprint(&bundle, &fingerprint(fp)?) {
                Some(cert) => CaCertificateRecord::new(name, cert),
                None => bail!("No certificate with fingerprint {fp} in the trust bundle"),
            }
        }
        None => {
            let content = host.query(&format!("sudo cat {}", install_path(key)))?;
            CaCertificateRecord::new(key, &parse_certificate(&content)?)
        }
    };
    Ok((record.name.clone(), to_value(&record)?))
}
