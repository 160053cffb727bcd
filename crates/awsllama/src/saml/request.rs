// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AuthnRequest` construction for the HTTP-Redirect binding.

use std::io::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use quick_xml::escape::escape;

use crate::saml::{IdpMetadata, HTTP_POST_BINDING};

/// Service-provider identity sent with each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProviderInfo {
    /// Issuer of the request (our entity id).
    pub entity_id: String,
    /// Where the IdP posts its response back to.
    pub acs_url: String,
}

/// Render an unsigned `AuthnRequest` addressed to `destination`.
pub fn authn_request_xml(sp: &ServiceProviderInfo, destination: &str, id: &str) -> String {
    let issue_instant = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    format!(
        "<samlp:AuthnRequest xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" \
         xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" \
         ID=\"{id}\" Version=\"2.0\" IssueInstant=\"{issue_instant}\" \
         Destination=\"{destination}\" AssertionConsumerServiceURL=\"{acs}\" \
         ProtocolBinding=\"{HTTP_POST_BINDING}\">\
         <saml:Issuer Format=\"urn:oasis:names:tc:SAML:2.0:nameid-format:entity\">{issuer}</saml:Issuer>\
         <samlp:NameIDPolicy Format=\"urn:oasis:names:tc:SAML:2.0:nameid-format:transient\" AllowCreate=\"true\"/>\
         </samlp:AuthnRequest>",
        id = escape(id),
        destination = escape(destination),
        acs = escape(sp.acs_url.as_str()),
        issuer = escape(sp.entity_id.as_str()),
    )
}

/// Deflate + base64 the request as the redirect binding requires.
pub fn encode_redirect_request(xml: &str) -> anyhow::Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Full SSO redirect URL with `SAMLRequest` and `RelayState` query params.
pub fn build_redirect_url(
    idp: &IdpMetadata,
    sp: &ServiceProviderInfo,
    relay_state: &str,
) -> anyhow::Result<String> {
    let location = idp.redirect_location()?;
    let id = format!("id-{}", uuid::Uuid::new_v4().simple());
    let encoded = encode_redirect_request(&authn_request_xml(sp, location, &id))?;

    let mut url = url::Url::parse(location)?;
    url.query_pairs_mut()
        .append_pair("SAMLRequest", &encoded)
        .append_pair("RelayState", relay_state);
    Ok(url.into())
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
