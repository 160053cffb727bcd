// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SAML `Response` parsing: status, issuer, and attribute statements.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::saml::{xml_attr, IdpMetadata};

const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlAttribute {
    pub name: String,
    pub values: Vec<String>,
}

/// Attributes asserted by the IdP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamlAssertion {
    pub issuer: Option<String>,
    pub attributes: Vec<SamlAttribute>,
}

impl SamlAssertion {
    /// All values of every attribute called `name`, in document order.
    pub fn attribute_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.name == name)
            .flat_map(|a| a.values.iter().map(String::as_str))
    }
}

/// Which element's text is being collected.
enum Capture {
    None,
    ResponseIssuer,
    AssertionIssuer,
    AttributeValue,
}

/// Parse a decoded SAML response and check it came from `idp`.
pub fn parse_response(idp: &IdpMetadata, xml: &[u8]) -> anyhow::Result<SamlAssertion> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut saw_response = false;
    let mut status: Option<String> = None;
    let mut in_status = false;
    let mut in_assertion = false;
    let mut saw_assertion = false;
    let mut response_issuer: Option<String> = None;
    let mut assertion_issuer: Option<String> = None;
    let mut attributes: Vec<SamlAttribute> = Vec::new();
    let mut capture = Capture::None;
    let mut text = String::new();

    loop {
        let (e, is_start) = match reader.read_event()? {
            Event::Start(e) => (e, true),
            Event::Empty(e) => (e, false),
            Event::Text(t) => {
                text.push_str(&t.unescape()?);
                continue;
            }
            Event::CData(c) => {
                text.push_str(std::str::from_utf8(&c)?);
                continue;
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"Status" => in_status = false,
                    b"Assertion" => in_assertion = false,
                    b"Issuer" | b"AttributeValue" => {
                        let value = std::mem::take(&mut text);
                        match std::mem::replace(&mut capture, Capture::None) {
                            Capture::ResponseIssuer => response_issuer = Some(value),
                            Capture::AssertionIssuer => assertion_issuer = Some(value),
                            Capture::AttributeValue => {
                                if let Some(attr) = attributes.last_mut() {
                                    attr.values.push(value);
                                }
                            }
                            Capture::None => {}
                        }
                    }
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"Response" => saw_response = true,
            b"Status" if is_start => in_status = true,
            // Only the top-level code counts; nested codes refine it.
            b"StatusCode" if in_status && status.is_none() => status = xml_attr(&e, "Value")?,
            b"EncryptedAssertion" => anyhow::bail!("encrypted assertions are not supported"),
            b"Assertion" if is_start => {
                if saw_assertion {
                    anyhow::bail!("response contains more than one assertion");
                }
                saw_assertion = true;
                in_assertion = true;
            }
            b"Issuer" if is_start => {
                text.clear();
                capture = if in_assertion {
                    Capture::AssertionIssuer
                } else {
                    Capture::ResponseIssuer
                };
            }
            b"Attribute" if in_assertion => {
                let name = xml_attr(&e, "Name")?
                    .ok_or_else(|| anyhow::anyhow!("attribute without a Name"))?;
                attributes.push(SamlAttribute { name, values: Vec::new() });
            }
            b"AttributeValue" if in_assertion => {
                text.clear();
                if is_start {
                    capture = Capture::AttributeValue;
                } else if let Some(attr) = attributes.last_mut() {
                    attr.values.push(String::new());
                }
            }
            _ => {}
        }
    }

    if !saw_response {
        anyhow::bail!("document is not a SAML Response");
    }
    match status.as_deref() {
        Some(STATUS_SUCCESS) => {}
        Some(other) => anyhow::bail!("IdP returned non-success status: {other}"),
        None => anyhow::bail!("response has no status code"),
    }
    if !saw_assertion {
        anyhow::bail!("response contains no assertion");
    }

    let issuer = assertion_issuer.or(response_issuer);
    if let Some(ref issuer) = issuer {
        if issuer != &idp.entity_id {
            anyhow::bail!("assertion issuer {issuer} does not match IdP {}", idp.entity_id);
        }
    }

    Ok(SamlAssertion { issuer, attributes })
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
