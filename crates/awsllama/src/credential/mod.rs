// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential model: configured accounts, STS-issued credentials, and the
//! in-memory store that decides which account needs a fresh login next.

pub mod persist;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured identity-provider-backed account.
///
/// Declaration order matters: it is the refresh priority for accounts that
/// have never been authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// IdP SAML metadata URL for this account's SSO application.
    pub metadata_url: String,
    /// Display name.
    #[serde(default)]
    pub nickname: String,
}

/// Temporary secret bundle issued by STS.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub security_token: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Credentials for one cloud account, tagged with the IdP that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub account_id: String,
    pub credential: Credential,
    pub metadata_url: String,
    pub expiration: DateTime<Utc>,
}

/// Summary row for the index view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub account_id: String,
    pub expiration: DateTime<Utc>,
    #[serde(default)]
    pub metadata_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Extract the account id from an assumed-role ARN.
///
/// `arn:aws:sts::050283019178:assumed-role/developer/user@example.com`
/// yields `050283019178`.
pub fn account_id_from_arn(arn: &str) -> anyhow::Result<String> {
    let fields: Vec<&str> = arn.split(':').collect();
    if fields.len() < 6 {
        anyhow::bail!("unable to extract account from malformed ARN: {arn}");
    }
    Ok(fields[4].to_owned())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
