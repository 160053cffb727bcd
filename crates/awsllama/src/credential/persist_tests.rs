// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{entry_expiring_in, parse_profiles};

fn with_tokens(
    mut entry: CredentialEntry,
    session: Option<&str>,
    security: Option<&str>,
) -> CredentialEntry {
    entry.credential.session_token = session.map(str::to_owned);
    entry.credential.security_token = security.map(str::to_owned);
    entry
}

#[test]
fn round_trip_recovers_profiles() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CredentialsFile::new(dir.path().join("credentials"));
    let entries = vec![
        with_tokens(entry_expiring_in("111111111111", "https://idp/a", 3600), Some("sess-a"), None),
        with_tokens(
            entry_expiring_in("222222222222", "https://idp/b", 3600),
            Some("sess-b"),
            Some("sec-b"),
        ),
        with_tokens(entry_expiring_in("333333333333", "https://idp/c", 3600), Some(""), None),
    ];

    file.store_credentials(&entries)?;
    let contents = std::fs::read_to_string(file.path())?;
    let profiles = parse_profiles(&contents);

    assert_eq!(profiles.len(), 3);
    for (profile, entry) in profiles.iter().zip(&entries) {
        assert_eq!(profile.name, format!("llama-{}", entry.account_id));
        assert_eq!(profile.get("aws_access_key_id"), Some(entry.credential.access_key_id.as_str()));
        assert_eq!(
            profile.get("aws_secret_access_key"),
            Some(entry.credential.secret_access_key.as_str())
        );
    }
    assert_eq!(profiles[0].get("aws_session_token"), Some("sess-a"));
    assert_eq!(profiles[0].get("aws_security_token"), None);
    assert_eq!(profiles[1].get("aws_security_token"), Some("sec-b"));
    // Empty tokens are omitted entirely.
    assert_eq!(profiles[2].get("aws_session_token"), None);
    Ok(())
}

#[test]
fn file_starts_with_managed_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CredentialsFile::new(dir.path().join("credentials"));
    file.store_credentials(&[])?;

    let contents = std::fs::read_to_string(file.path())?;
    assert_eq!(contents.lines().next(), Some(MANAGED_HEADER));
    Ok(())
}

#[test]
fn store_overwrites_instead_of_appending() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CredentialsFile::new(dir.path().join("credentials"));
    file.store_credentials(&[entry_expiring_in("1", "https://idp/a", 60)])?;
    file.store_credentials(&[entry_expiring_in("2", "https://idp/b", 60)])?;

    let profiles = parse_profiles(&std::fs::read_to_string(file.path())?);
    let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["llama-2"]);
    Ok(())
}

#[test]
fn unmanaged_file_backed_up_exactly_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials");
    let original = "[default]\naws_access_key_id = AKIAUSER\n";
    std::fs::write(&path, original)?;

    let file = CredentialsFile::new(&path);
    file.store_credentials(&[entry_expiring_in("1", "https://idp/a", 60)])?;
    assert_eq!(std::fs::read_to_string(file.backup_path())?, original);

    // Mark the backup so a second backup would be detectable.
    std::fs::write(file.backup_path(), "sentinel")?;
    file.store_credentials(&[entry_expiring_in("1", "https://idp/a", 60)])?;
    file.store_credentials(&[])?;
    assert_eq!(std::fs::read_to_string(file.backup_path())?, "sentinel");
    Ok(())
}

#[test]
fn stale_backup_is_replaced() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials");
    let file = CredentialsFile::new(&path);
    std::fs::write(file.backup_path(), "old backup")?;
    std::fs::write(&path, "[default]\n")?;

    file.store_credentials(&[])?;
    assert_eq!(std::fs::read_to_string(file.backup_path())?, "[default]\n");
    Ok(())
}

#[test]
fn managed_header_after_blank_lines_is_recognized() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials");
    std::fs::write(&path, format!("\n  \n{MANAGED_HEADER}\n[llama-1]\n"))?;

    let file = CredentialsFile::new(&path);
    file.store_credentials(&[])?;
    assert!(!file.backup_path().exists());
    Ok(())
}

#[test]
fn creates_missing_parent_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CredentialsFile::new(dir.path().join(".aws").join("credentials"));
    file.store_credentials(&[entry_expiring_in("1", "https://idp/a", 60)])?;
    assert!(file.path().exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn credentials_file_is_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let file = CredentialsFile::new(dir.path().join("credentials"));
    file.store_credentials(&[entry_expiring_in("1", "https://idp/a", 60)])?;

    let mode = std::fs::metadata(file.path())?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}

#[test]
fn private_create_refuses_existing_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("taken");
    std::fs::write(&path, "planted")?;

    assert!(create_private(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path)?, "planted");
    Ok(())
}

#[test]
fn write_failure_propagates() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "")?;

    let file = CredentialsFile::new(blocker.join("credentials"));
    assert!(file.store_credentials(&[]).is_err());
    Ok(())
}

#[test]
fn backup_path_appends_suffix() -> anyhow::Result<()> {
    let file = CredentialsFile::new("/home/user/.aws/credentials");
    assert_eq!(file.backup_path(), PathBuf::from("/home/user/.aws/credentials.bak"));
    Ok(())
}
