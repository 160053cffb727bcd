// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IdP `EntityDescriptor` metadata parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::saml::{xml_attr, HTTP_POST_BINDING, HTTP_REDIRECT_BINDING};

/// A single `SingleSignOnService` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoService {
    pub binding: String,
    pub location: String,
}

/// The parts of an IdP's metadata the login flow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpMetadata {
    pub entity_id: String,
    pub sso_services: Vec<SsoService>,
}

impl IdpMetadata {
    pub fn sso_location(&self, binding: &str) -> Option<&str> {
        self.sso_services.iter().find(|s| s.binding == binding).map(|s| s.location.as_str())
    }

    /// Location for the HTTP-Redirect binding.
    ///
    /// IdPs that only advertise HTTP-POST are rejected: the login flow is a
    /// plain browser redirect.
    pub fn redirect_location(&self) -> anyhow::Result<&str> {
        if let Some(location) = self.sso_location(HTTP_REDIRECT_BINDING) {
            return Ok(location);
        }
        if self.sso_location(HTTP_POST_BINDING).is_some() {
            anyhow::bail!("unsupported binding type: {HTTP_POST_BINDING}");
        }
        anyhow::bail!("IdP metadata for {} has no SingleSignOnService", self.entity_id)
    }
}

/// Parse an `EntityDescriptor` (prefixed or not; an `EntitiesDescriptor`
/// wrapper is accepted and its first IdP is used).
pub fn parse_metadata(xml: &str) -> anyhow::Result<IdpMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entity_id: Option<String> = None;
    let mut current_entity: Option<String> = None;
    let mut in_idp = false;
    let mut services = Vec::new();

    loop {
        let (e, is_start) = match reader.read_event()? {
            Event::Start(e) => (e, true),
            Event::Empty(e) => (e, false),
            Event::End(e) => {
                if e.local_name().as_ref() == b"IDPSSODescriptor" {
                    in_idp = false;
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"EntityDescriptor" => current_entity = xml_attr(&e, "entityID")?,
            b"IDPSSODescriptor" if is_start && entity_id.is_none() => {
                in_idp = true;
                entity_id = current_entity.clone();
            }
            b"SingleSignOnService" if in_idp => {
                if let (Some(binding), Some(location)) =
                    (xml_attr(&e, "Binding")?, xml_attr(&e, "Location")?)
                {
                    services.push(SsoService { binding, location });
                }
            }
            _ => {}
        }
    }

    let entity_id = entity_id.ok_or_else(|| anyhow::anyhow!("metadata has no IDPSSODescriptor"))?;
    if services.is_empty() {
        anyhow::bail!("IdP metadata for {entity_id} has no SingleSignOnService");
    }
    Ok(IdpMetadata { entity_id, sso_services: services })
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
