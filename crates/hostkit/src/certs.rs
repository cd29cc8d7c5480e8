//! CA certificate bundles.
//!
//! Bundles are split into PEM blocks first and each block is decoded on its
//! own, so a single damaged entry in `/etc/ssl/certs/ca-certificates.crt`
//! costs that entry and nothing else.

use crate::error::{Error, Result};
use crate::files::{self, FileUpload};
use crate::types::{CertificateRecord, Command};
use pem::{EncodeConfig, LineEnding, Pem};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

/// Reads the system trust bundle.
pub const READ_COMMAND: &str = "sudo bash -c 'cat /etc/ssl/certs/ca-certificates.crt'";

/// Rebuilds the system trust bundle from the certificate directories.
pub const UPDATE_COMMAND: &str = "sudo update-ca-certificates -f";

/// Directory for locally installed CA certificates.
pub const INSTALL_DIR: &str = "/usr/local/share/ca-certificates";

/// Serial numbers are stored in a fixed field of this many bytes.
pub const SERIAL_LEN: usize = 20;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

static PEM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)-----BEGIN ([^-]+)-----.*?-----END [^-]+-----").expect("pem block regex")
});

/// Left-pad a big-endian serial into the fixed field.
///
/// Leading zero bytes (DER sign padding) are dropped first. Anything still
/// longer than [`SERIAL_LEN`] is rejected rather than truncated.
pub fn fixed_serial(raw: &[u8]) -> Result<[u8; SERIAL_LEN]> {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    let significant = &raw[start..];
    if significant.len() > SERIAL_LEN {
        return Err(Error::parse(
            "certificate",
            format!(
                "serial number is {} bytes, longer than the {SERIAL_LEN}-byte maximum",
                significant.len()
            ),
        ));
    }
    let mut serial = [0u8; SERIAL_LEN];
    serial[SERIAL_LEN - significant.len()..].copy_from_slice(significant);
    Ok(serial)
}

/// `ab:cd:ef` form used for fingerprints and serials.
pub fn encode_hex_colon(bytes: &[u8]) -> String {
    let digits = hex::encode(bytes);
    digits
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect::<Vec<_>>()
        .join(":")
}

/// Inverse of [`encode_hex_colon`]; accepts either case.
pub fn decode_hex_colon(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| *c != ':').collect();
    hex::decode(&digits)
        .map_err(|e| Error::parse("hex string", format!("'{text}': {e}")))
}

fn from_der(der: &[u8]) -> Result<CertificateRecord> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::parse("certificate", format!("invalid X.509 DER: {e}")))?;

    let fingerprint: [u8; 32] = Sha256::digest(der).into();
    let pem = pem::encode_config(
        &Pem::new(CERTIFICATE_TAG, der.to_vec()),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    );

    Ok(CertificateRecord {
        fingerprint,
        serial_number: fixed_serial(cert.raw_serial())?,
        subject: cert.subject().to_string(),
        pem,
    })
}

/// Decode one PEM block. `Ok(None)` when it is not a certificate.
fn decode_block(block: &str) -> Result<Option<CertificateRecord>> {
    let parsed = pem::parse(block).map_err(|e| Error::parse("PEM block", e.to_string()))?;
    if parsed.tag() != CERTIFICATE_TAG {
        return Ok(None);
    }
    from_der(parsed.contents()).map(Some)
}

/// Parse every certificate in a PEM bundle, in bundle order.
///
/// Blocks with another label are skipped. Blocks that fail to decode are
/// skipped with a warning.
pub fn parse_bundle(bundle: &str) -> Vec<CertificateRecord> {
    let mut certificates = Vec::new();
    for (index, block) in PEM_BLOCK.find_iter(bundle).enumerate() {
        match decode_block(block.as_str()) {
            Ok(Some(cert)) => certificates.push(cert),
            Ok(None) => {}
            Err(e) => log::warn!("skipping PEM block #{}: {e}", index + 1),
        }
    }
    log::debug!("parsed {} certificate(s) from bundle", certificates.len());
    certificates
}

/// Parse the first certificate in `content`. Any failure is an error.
pub fn parse_certificate(content: &str) -> Result<CertificateRecord> {
    for block in PEM_BLOCK.find_iter(content) {
        if let Some(cert) = decode_block(block.as_str())? {
            return Ok(cert);
        }
    }
    Err(Error::parse("certificate", "no CERTIFICATE block found"))
}

/// First certificate with `fingerprint`.
pub fn by_fingerprint<'a>(
    certificates: &'a [CertificateRecord],
    fingerprint: &[u8; 32],
) -> Option<&'a CertificateRecord> {
    certificates.iter().find(|c| &c.fingerprint == fingerprint)
}

pub fn install_path(name: &str) -> String {
    format!("{INSTALL_DIR}/{name}.crt")
}

/// Write the certificate file (root-owned, 0600) and refresh the bundle.
///
/// The file gets the re-encoded PEM of `cert`, never the text it was
/// parsed from.
pub fn install_commands(name: &str, cert: &CertificateRecord) -> Vec<Command> {
    let upload = FileUpload {
        destination: install_path(name),
        content: cert.pem.trim_end().to_string(),
        mode: 0o600,
        uid: Some(0),
        gid: Some(0),
    };
    let mut commands = files::upload_commands(&upload);
    commands.push(Command::new(UPDATE_COMMAND));
    commands
}

/// Remove the certificate file and refresh the bundle.
pub fn remove_commands(name: &str) -> Vec<Command> {
    vec![
        Command::new(format!("sudo rm -f {}", install_path(name))),
        Command::new(UPDATE_COMMAND),
    ]
}
