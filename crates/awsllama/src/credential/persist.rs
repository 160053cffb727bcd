// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credentials file writer: renders the store as profile sections and
//! replaces the file atomically (write tmp + rename).

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::credential::CredentialEntry;

/// Profile sections are named `llama-<account id>`.
pub const PROFILE_PREFIX: &str = "llama";

/// First line of every file this tool writes.
pub const MANAGED_HEADER: &str = "; This file is managed by aws-llama";

/// Writer for the shared credentials file.
#[derive(Debug, Clone)]
pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path that receives a pre-existing unmanaged file.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Overwrite the credentials file with one profile per entry.
    ///
    /// An existing file without the managed header is moved to
    /// [`Self::backup_path`] first.
    pub fn store_credentials(&self, entries: &[CredentialEntry]) -> anyhow::Result<()> {
        if self.backup_unmanaged()? {
            tracing::info!(
                path = %self.path.display(),
                backup = %self.backup_path().display(),
                "backed up unmanaged credentials file"
            );
        }

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let contents = render(entries);
        write_atomic(&self.path, contents.as_bytes())?;
        tracing::debug!(
            path = %self.path.display(),
            profiles = entries.len(),
            "credentials written"
        );
        Ok(())
    }

    /// Returns true when a backup was made.
    fn backup_unmanaged(&self) -> anyhow::Result<bool> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if contents.trim_matches(|c| c == ' ' || c == '\n').starts_with(MANAGED_HEADER) {
            return Ok(false);
        }

        let backup = self.backup_path();
        match std::fs::remove_file(&backup) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::rename(&self.path, &backup)?;
        Ok(true)
    }
}

/// Render the full file contents: header line, then one section per entry.
pub fn render(entries: &[CredentialEntry]) -> String {
    let mut out = String::with_capacity(64 + entries.len() * 256);
    out.push_str(MANAGED_HEADER);
    out.push('\n');
    for entry in entries {
        let cred = &entry.credential;
        // Writing into a String cannot fail.
        let _ = writeln!(out, "[{PROFILE_PREFIX}-{}]", entry.account_id);
        let _ = writeln!(out, "aws_access_key_id = {}", cred.access_key_id);
        let _ = writeln!(out, "aws_secret_access_key = {}", cred.secret_access_key);
        if let Some(token) = cred.session_token.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "aws_session_token = {token}");
        }
        if let Some(token) = cred.security_token.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "aws_security_token = {token}");
        }
        out.push('\n');
    }
    out
}

/// Write via a unique temp sibling then rename, so readers never observe a
/// half-written file.
fn write_atomic(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = create_private(&tmp_path)?;
    let written = file.write_all(contents).and_then(|()| file.sync_all());
    drop(file);
    if let Err(e) = written.and_then(|()| std::fs::rename(&tmp_path, path)) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Create a new file that is owner-only (0600 on unix) from the start.
fn create_private(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
