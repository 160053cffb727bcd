// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn account_id_from_assumed_role_arn() -> anyhow::Result<()> {
    let id = account_id_from_arn(
        "arn:aws:sts::050283019178:assumed-role/developer/user@example.com",
    )?;
    assert_eq!(id, "050283019178");
    Ok(())
}

#[yare::parameterized(
    four_fields = { "arn:aws:sts::050283019178" },
    empty       = { "" },
    no_colons   = { "not-an-arn" },
)]
fn account_id_rejects_short_arn(arn: &str) {
    crate::assert_err_contains!(account_id_from_arn(arn), "malformed ARN");
}

#[test]
fn credential_debug_redacts_secrets() -> anyhow::Result<()> {
    let cred = Credential {
        access_key_id: "AKIAEXAMPLE".to_owned(),
        secret_access_key: "super-secret".to_owned(),
        session_token: Some("session-secret".to_owned()),
        security_token: None,
    };
    let rendered = format!("{cred:?}");
    assert!(rendered.contains("AKIAEXAMPLE"));
    assert!(!rendered.contains("super-secret"));
    assert!(!rendered.contains("session-secret"));
    Ok(())
}
