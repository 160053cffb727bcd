// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service-provider handle: fetches and caches IdP metadata by URL.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::saml::metadata::parse_metadata;
use crate::saml::request::{build_redirect_url, ServiceProviderInfo};
use crate::saml::response::parse_response;
use crate::saml::{IdentityProvider, IdpMetadata, SamlAssertion};
use crate::BoxFuture;

/// Path of the assertion consumer service on the local server.
pub const ACS_PATH: &str = "/sso/saml";

pub struct SamlServiceProvider {
    info: ServiceProviderInfo,
    http: reqwest::Client,
    cache: RwLock<HashMap<String, Arc<IdpMetadata>>>,
}

impl SamlServiceProvider {
    /// `root_url` is the externally visible base of the local server,
    /// e.g. `http://localhost:2600`.
    pub fn new(root_url: &str, http: reqwest::Client) -> Self {
        let acs = format!("{}{ACS_PATH}", root_url.trim_end_matches('/'));
        Self {
            info: ServiceProviderInfo { entity_id: acs.clone(), acs_url: acs },
            http,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn info(&self) -> &ServiceProviderInfo {
        &self.info
    }

    async fn fetch(&self, metadata_url: &str) -> anyhow::Result<IdpMetadata> {
        let resp = self.http.get(metadata_url).send().await?.error_for_status()?;
        let body = resp.text().await?;
        parse_metadata(&body)
    }
}

impl IdentityProvider for SamlServiceProvider {
    fn resolve<'a>(
        &'a self,
        metadata_url: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<IdpMetadata>>> {
        Box::pin(async move {
            if let Some(hit) = self.cache.read().await.get(metadata_url) {
                return Ok(Arc::clone(hit));
            }

            let meta = Arc::new(self.fetch(metadata_url).await?);
            tracing::debug!(metadata_url, entity_id = %meta.entity_id, "fetched IdP metadata");
            let mut cache = self.cache.write().await;
            // Another task may have raced us; keep whichever landed first.
            let entry = cache.entry(metadata_url.to_owned()).or_insert(meta);
            Ok(Arc::clone(entry))
        })
    }

    fn redirect_url(&self, idp: &IdpMetadata, relay_state: &str) -> anyhow::Result<String> {
        build_redirect_url(idp, &self.info, relay_state)
    }

    fn parse_response(&self, idp: &IdpMetadata, xml: &[u8]) -> anyhow::Result<SamlAssertion> {
        parse_response(idp, xml)
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
