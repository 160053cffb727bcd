// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read as _;

use flate2::read::DeflateDecoder;

use super::*;
use crate::saml::metadata::SsoService;
use crate::saml::HTTP_REDIRECT_BINDING;

fn sp() -> ServiceProviderInfo {
    ServiceProviderInfo {
        entity_id: "http://localhost:2600/sso/saml".to_owned(),
        acs_url: "http://localhost:2600/sso/saml".to_owned(),
    }
}

fn idp(location: &str) -> IdpMetadata {
    IdpMetadata {
        entity_id: "http://www.okta.com/exk1".to_owned(),
        sso_services: vec![SsoService {
            binding: HTTP_REDIRECT_BINDING.to_owned(),
            location: location.to_owned(),
        }],
    }
}

fn inflate(encoded: &str) -> anyhow::Result<String> {
    let compressed = STANDARD.decode(encoded)?;
    let mut xml = String::new();
    DeflateDecoder::new(compressed.as_slice()).read_to_string(&mut xml)?;
    Ok(xml)
}

#[test]
fn authn_request_names_destination_and_acs() -> anyhow::Result<()> {
    let xml = authn_request_xml(&sp(), "https://idp/sso?x=1&y=2", "id-abc");
    assert!(xml.contains("ID=\"id-abc\""));
    assert!(xml.contains("Destination=\"https://idp/sso?x=1&amp;y=2\""));
    assert!(xml.contains("AssertionConsumerServiceURL=\"http://localhost:2600/sso/saml\""));
    assert!(xml.contains(">http://localhost:2600/sso/saml</saml:Issuer>"));
    Ok(())
}

#[test]
fn encode_is_raw_deflate_base64() -> anyhow::Result<()> {
    let xml = authn_request_xml(&sp(), "https://idp/sso", "id-1");
    let encoded = encode_redirect_request(&xml)?;
    assert_eq!(inflate(&encoded)?, xml);
    Ok(())
}

#[test]
fn redirect_url_carries_request_and_relay_state() -> anyhow::Result<()> {
    let relay = "https://example.okta.com/app/exk1/sso/saml/metadata";
    let redirect = build_redirect_url(&idp("https://idp.example/sso?tenant=t1"), &sp(), relay)?;
    let url = url::Url::parse(&redirect)?;

    assert_eq!(url.host_str(), Some("idp.example"));
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs[0], ("tenant".to_owned(), "t1".to_owned()));
    assert_eq!(pairs[1].0, "SAMLRequest");
    assert_eq!(pairs[2], ("RelayState".to_owned(), relay.to_owned()));

    let xml = inflate(&pairs[1].1)?;
    assert!(xml.contains("Destination=\"https://idp.example/sso?tenant=t1\""));
    Ok(())
}

#[test]
fn redirect_ids_are_unique() -> anyhow::Result<()> {
    let a = build_redirect_url(&idp("https://idp/sso"), &sp(), "r")?;
    let b = build_redirect_url(&idp("https://idp/sso"), &sp(), "r")?;
    assert_ne!(a, b);
    Ok(())
}
