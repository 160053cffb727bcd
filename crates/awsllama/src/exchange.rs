// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login initiation and the SAML-callback exchange: assertion in, STS
//! credentials upserted and persisted, next step out.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::credential::{account_id_from_arn, CredentialEntry};
use crate::error::ErrorCode;
use crate::saml::extract_role_pairs;
use crate::state::LlamaState;

/// Failures of the login/callback flow, each mapped to an HTTP error code.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("failed to decode SAMLResponse: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("failed to resolve IdP metadata for {url}: {reason}")]
    Metadata { url: String, reason: String },

    #[error("failed to build SSO redirect for {url}: {reason}")]
    RedirectBuild { url: String, reason: String },

    #[error("failed to parse SAML response for {url}: {reason}")]
    AssertionParse { url: String, reason: String },

    #[error("{0}")]
    RolePair(String),

    #[error("assertion from {0} grants no roles")]
    NoRoles(String),

    #[error("failed to assume role {role_arn}: {reason}")]
    AssumeRole { role_arn: String, reason: String },

    #[error("{0}")]
    MalformedArn(String),

    #[error("failed to write credentials file: {0}")]
    Persist(String),
}

impl ExchangeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AssumeRole { .. } => ErrorCode::UpstreamError,
            Self::Persist(_) => ErrorCode::Internal,
            Self::InvalidBase64(_)
            | Self::Metadata { .. }
            | Self::RedirectBuild { .. }
            | Self::AssertionParse { .. }
            | Self::RolePair(_)
            | Self::NoRoles(_)
            | Self::MalformedArn(_) => ErrorCode::BadRequest,
        }
    }
}

/// Where `/login` sends the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAction {
    /// IdP SSO URL carrying the request and relay state.
    Redirect(String),
    /// Nothing to authenticate.
    Home,
}

impl LoginAction {
    pub fn location(&self) -> &str {
        match self {
            Self::Redirect(url) => url,
            Self::Home => "/",
        }
    }
}

/// What follows a completed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Another account still needs a login.
    Login(String),
    Home,
}

impl NextAction {
    pub fn location(&self) -> String {
        match self {
            Self::Login(metadata_url) => {
                let query: String = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("metadata_url", metadata_url)
                    .finish();
                format!("/login?{query}")
            }
            Self::Home => "/".to_owned(),
        }
    }
}

/// Pure decision from the eligibility query result.
pub fn next_action(next_metadata_url: Option<String>) -> NextAction {
    match next_metadata_url {
        Some(url) => NextAction::Login(url),
        None => NextAction::Home,
    }
}

/// Pick the account to log into and build its SSO redirect.
///
/// An empty `requested` is treated as absent.
pub async fn initiate_login(
    state: &LlamaState,
    requested: Option<&str>,
) -> Result<LoginAction, ExchangeError> {
    let metadata_url = match requested.filter(|u| !u.is_empty()) {
        Some(url) => url.to_owned(),
        None => match state.next_metadata_url_for_refresh().await {
            Some(url) => url,
            None => {
                debug!("login requested with nothing to refresh");
                return Ok(LoginAction::Home);
            }
        },
    };

    let idp = state.idp.resolve(&metadata_url).await.map_err(|e| ExchangeError::Metadata {
        url: metadata_url.clone(),
        reason: format!("{e:#}"),
    })?;
    let redirect = state.idp.redirect_url(&idp, &metadata_url).map_err(|e| {
        ExchangeError::RedirectBuild { url: metadata_url.clone(), reason: format!("{e:#}") }
    })?;

    info!(metadata_url = %metadata_url, "redirecting to IdP");
    Ok(LoginAction::Redirect(redirect))
}

/// Exchange an IdP assertion for credentials on every role it grants.
///
/// Pairs are processed in order. A failure stops the batch; pairs already
/// exchanged stay in the store (and are not persisted by this call). The
/// next action never points back at `relay_state`.
pub async fn handle_assertion(
    state: &LlamaState,
    saml_response: &str,
    relay_state: &str,
) -> Result<NextAction, ExchangeError> {
    // IdPs may line-wrap the encoding.
    let compact: String = saml_response.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let xml = STANDARD.decode(compact)?;

    let idp = state.idp.resolve(relay_state).await.map_err(|e| ExchangeError::Metadata {
        url: relay_state.to_owned(),
        reason: format!("{e:#}"),
    })?;
    let assertion = state.idp.parse_response(&idp, &xml).map_err(|e| {
        ExchangeError::AssertionParse { url: relay_state.to_owned(), reason: format!("{e:#}") }
    })?;
    let pairs =
        extract_role_pairs(&assertion).map_err(|e| ExchangeError::RolePair(format!("{e:#}")))?;
    if pairs.is_empty() {
        warn!(metadata_url = %relay_state, "assertion grants no roles");
        return Err(ExchangeError::NoRoles(relay_state.to_owned()));
    }

    for pair in &pairs {
        debug!(role_arn = %pair.role_arn, provider_arn = %pair.provider_arn, "assuming role");
        let role = state
            .sts
            .assume_role_with_saml(&pair.provider_arn, &pair.role_arn, saml_response)
            .await
            .map_err(|e| ExchangeError::AssumeRole {
                role_arn: pair.role_arn.clone(),
                reason: format!("{e:#}"),
            })?;
        let account_id = account_id_from_arn(&role.assumed_role_arn)
            .map_err(|e| ExchangeError::MalformedArn(format!("{e:#}")))?;

        info!(account_id = %account_id, expiration = %role.expiration, "credentials issued");
        state
            .upsert(CredentialEntry {
                account_id,
                credential: role.credential,
                metadata_url: relay_state.to_owned(),
                expiration: role.expiration,
            })
            .await;
    }

    state.persist().await.map_err(|e| ExchangeError::Persist(format!("{e:#}")))?;

    Ok(next_action(state.next_metadata_url_after(relay_state).await))
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
