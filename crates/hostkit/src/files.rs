//! Remote text file upload over the command channel.

use crate::types::Command;

/// A text file to place on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Absolute remote path
    pub destination: String,
    pub content: String,
    /// Permission bits, e.g. `0o644`
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// `touch`, optional `chown`, `chmod`, then a heredoc `tee` of the content.
///
/// Ownership and mode are set before the content lands, so the file is
/// never world-readable with content in it. The delimiter is quoted, so the
/// remote shell writes the content verbatim. The content must not contain a
/// line consisting of `EOF`.
pub fn upload_commands(upload: &FileUpload) -> Vec<Command> {
    let path = &upload.destination;
    let mut commands = vec![Command::new(format!("sudo touch {path}"))];

    let owner = match (upload.uid, upload.gid) {
        (None, None) => None,
        (Some(uid), None) => Some(uid.to_string()),
        (None, Some(gid)) => Some(format!(":{gid}")),
        (Some(uid), Some(gid)) => Some(format!("{uid}:{gid}")),
    };
    if let Some(owner) = owner {
        commands.push(Command::new(format!("sudo chown {owner} {path}")));
    }

    commands.push(Command::new(format!("sudo chmod {:o} {path}", upload.mode)));
    commands.push(Command::new(format!(
        "cat << 'EOF' | sudo tee {path}\n{}\nEOF",
        upload.content
    )));
    commands
}
