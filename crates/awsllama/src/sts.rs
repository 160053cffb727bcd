// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! STS `AssumeRoleWithSAML` through the AWS SDK.
//!
//! The call is unsigned: the SAML assertion is the proof of identity, so the
//! client is built without a credential provider.

use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_sts::config::Region;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sts::operation::assume_role_with_saml::{
    AssumeRoleWithSAMLError, AssumeRoleWithSamlOutput,
};
use chrono::{DateTime, Utc};

use crate::credential::Credential;
use crate::BoxFuture;

/// Region used for endpoint resolution only.
pub const STS_REGION: &str = "us-east-1";

/// Result of a successful role assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumedRole {
    pub credential: Credential,
    /// e.g. `arn:aws:sts::123456789012:assumed-role/developer/user@example.com`
    pub assumed_role_arn: String,
    pub expiration: DateTime<Utc>,
}

/// Exchanges a SAML assertion for temporary credentials.
pub trait CredentialExchange: Send + Sync {
    fn assume_role_with_saml<'a>(
        &'a self,
        provider_arn: &'a str,
        role_arn: &'a str,
        assertion: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<AssumedRole>>;
}

pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    pub async fn new(timeout: Duration) -> Self {
        Self::build(None, timeout).await
    }

    /// Client pointed at a custom endpoint (local STS stand-ins).
    pub async fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::build(Some(endpoint.into()), timeout).await
    }

    async fn build(endpoint: Option<String>, timeout: Duration) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .region(Region::new(STS_REGION))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        Self { client: aws_sdk_sts::Client::new(&config) }
    }

    async fn call(
        &self,
        provider_arn: &str,
        role_arn: &str,
        assertion: &str,
    ) -> anyhow::Result<AssumedRole> {
        let output = self
            .client
            .assume_role_with_saml()
            .role_arn(role_arn)
            .principal_arn(provider_arn)
            .saml_assertion(assertion)
            .send()
            .await
            .map_err(describe_error)?;
        assumed_role_from_output(&output)
    }
}

impl CredentialExchange for StsClient {
    fn assume_role_with_saml<'a>(
        &'a self,
        provider_arn: &'a str,
        role_arn: &'a str,
        assertion: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<AssumedRole>> {
        Box::pin(self.call(provider_arn, role_arn, assertion))
    }
}

fn describe_error(e: SdkError<AssumeRoleWithSAMLError>) -> anyhow::Error {
    match &e {
        SdkError::ServiceError(service_err) => {
            let err = service_err.err();
            anyhow::anyhow!(
                "STS returned {}: {}",
                err.code().unwrap_or("Unknown"),
                err.message().unwrap_or("no message")
            )
        }
        _ => anyhow::anyhow!("STS request failed: {}", DisplayErrorContext(&e)),
    }
}

fn assumed_role_from_output(output: &AssumeRoleWithSamlOutput) -> anyhow::Result<AssumedRole> {
    let credentials = output
        .credentials()
        .ok_or_else(|| anyhow::anyhow!("STS response carries no credentials"))?;
    let user = output
        .assumed_role_user()
        .ok_or_else(|| anyhow::anyhow!("STS response carries no assumed role user"))?;

    let expires = credentials.expiration();
    let expiration = DateTime::<Utc>::from_timestamp(expires.secs(), expires.subsec_nanos())
        .ok_or_else(|| anyhow::anyhow!("STS expiration out of range: {expires}"))?;

    Ok(AssumedRole {
        credential: Credential {
            access_key_id: credentials.access_key_id().to_owned(),
            secret_access_key: credentials.secret_access_key().to_owned(),
            session_token: Some(credentials.session_token().to_owned()).filter(|t| !t.is_empty()),
            security_token: None,
        },
        assumed_role_arn: user.arn().to_owned(),
        expiration,
    })
}

#[cfg(test)]
#[path = "sts_tests.rs"]
mod tests;
