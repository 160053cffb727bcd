// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const OKTA_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="http://www.okta.com/exk1example">
  <md:IDPSSODescriptor WantAuthnRequestsSigned="false" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:KeyDescriptor use="signing">
      <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
        <ds:X509Data><ds:X509Certificate>MIIDpDCCAoygAwIBAgIGAV</ds:X509Certificate></ds:X509Data>
      </ds:KeyInfo>
    </md:KeyDescriptor>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified</md:NameIDFormat>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://example.okta.com/app/example/exk1example/sso/saml"/>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://example.okta.com/app/example/exk1example/sso/saml?a=1&amp;b=2"/>
  </md:IDPSSODescriptor>
</md:EntityDescriptor>"#;

#[test]
fn parses_prefixed_okta_metadata() -> anyhow::Result<()> {
    let meta = parse_metadata(OKTA_METADATA)?;
    assert_eq!(meta.entity_id, "http://www.okta.com/exk1example");
    assert_eq!(meta.sso_services.len(), 2);
    assert_eq!(
        meta.redirect_location()?,
        "https://example.okta.com/app/example/exk1example/sso/saml?a=1&b=2"
    );
    Ok(())
}

#[test]
fn parses_unprefixed_non_empty_elements() -> anyhow::Result<()> {
    let xml = r#"<EntitiesDescriptor>
      <EntityDescriptor entityID="urn:sp"><SPSSODescriptor/></EntityDescriptor>
      <EntityDescriptor entityID="urn:idp">
        <IDPSSODescriptor>
          <SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp/sso"></SingleSignOnService>
        </IDPSSODescriptor>
      </EntityDescriptor>
    </EntitiesDescriptor>"#;

    let meta = parse_metadata(xml)?;
    assert_eq!(meta.entity_id, "urn:idp");
    assert_eq!(meta.redirect_location()?, "https://idp/sso");
    Ok(())
}

#[test]
fn post_only_idp_is_unsupported() -> anyhow::Result<()> {
    let meta = IdpMetadata {
        entity_id: "urn:idp".to_owned(),
        sso_services: vec![SsoService {
            binding: HTTP_POST_BINDING.to_owned(),
            location: "https://idp/sso".to_owned(),
        }],
    };
    crate::assert_err_contains!(meta.redirect_location(), "unsupported binding type");
    Ok(())
}

#[yare::parameterized(
    no_idp_descriptor = { r#"<EntityDescriptor entityID="urn:sp"><SPSSODescriptor/></EntityDescriptor>"#, "no IDPSSODescriptor" },
    no_sso_service    = { r#"<EntityDescriptor entityID="urn:idp"><IDPSSODescriptor></IDPSSODescriptor></EntityDescriptor>"#, "no SingleSignOnService" },
)]
fn rejects_incomplete_metadata(xml: &str, expected: &str) {
    crate::assert_err_contains!(parse_metadata(xml), expected);
}

#[test]
fn rejects_malformed_xml() -> anyhow::Result<()> {
    assert!(parse_metadata("<EntityDescriptor entityID=\"x\"><IDPSSODescriptor></Oops>").is_err());
    Ok(())
}
