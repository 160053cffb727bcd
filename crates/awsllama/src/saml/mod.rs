// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SAML service-provider side: IdP metadata, redirect-binding login
//! requests, and attribute extraction from the IdP's response.
//!
//! Signature and timestamp validation are not performed here. STS validates
//! the assertion again when it is exchanged.

pub mod metadata;
pub mod provider;
pub mod request;
pub mod response;

use std::sync::Arc;

use quick_xml::events::BytesStart;

use crate::BoxFuture;

pub use metadata::IdpMetadata;
pub use provider::SamlServiceProvider;
pub use response::SamlAssertion;

/// Attribute carrying `role_arn,provider_arn` pairs.
pub const AWS_ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";

pub const HTTP_REDIRECT_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";
pub const HTTP_POST_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

/// IdP collaborator used by the callback exchange.
///
/// Object-safe for use as `Arc<dyn IdentityProvider>`.
pub trait IdentityProvider: Send + Sync {
    /// Fetch (or return cached) metadata for an IdP.
    fn resolve<'a>(
        &'a self,
        metadata_url: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<IdpMetadata>>>;

    /// Build the SSO redirect URL carrying `relay_state`.
    fn redirect_url(&self, idp: &IdpMetadata, relay_state: &str) -> anyhow::Result<String>;

    /// Parse a decoded SAML response document.
    fn parse_response(&self, idp: &IdpMetadata, xml: &[u8]) -> anyhow::Result<SamlAssertion>;
}

/// A cloud role and the federated provider that vouches for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePair {
    pub role_arn: String,
    pub provider_arn: String,
}

impl RolePair {
    /// Parse `"<role arn>,<provider arn>"`.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let fields: Vec<&str> = value.split(',').collect();
        let [role_arn, provider_arn] = fields.as_slice() else {
            anyhow::bail!("failed to parse role pair from string: {value}");
        };
        Ok(Self { role_arn: (*role_arn).to_owned(), provider_arn: (*provider_arn).to_owned() })
    }
}

/// Collect every role pair in the assertion. One malformed value fails the
/// whole assertion.
pub fn extract_role_pairs(assertion: &SamlAssertion) -> anyhow::Result<Vec<RolePair>> {
    assertion.attribute_values(AWS_ROLE_ATTRIBUTE).map(RolePair::parse).collect()
}

/// Unescaped value of an unprefixed attribute.
fn xml_attr(e: &BytesStart<'_>, name: &str) -> anyhow::Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
