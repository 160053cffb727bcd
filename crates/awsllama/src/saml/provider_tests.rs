// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::routing::get;
use axum::Router;

use super::*;
use crate::test_support::spawn_stub_server;

const METADATA: &str = r#"<EntityDescriptor entityID="http://www.okta.com/exk1">
  <IDPSSODescriptor>
    <SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example/sso"/>
  </IDPSSODescriptor>
</EntityDescriptor>"#;

async fn metadata_server() -> anyhow::Result<(String, Arc<AtomicU32>)> {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new()
        .route(
            "/metadata",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                    METADATA
                }
            }),
        )
        .route("/broken", get(|| async { "<html>not metadata</html>" }));
    let (addr, _handle) = spawn_stub_server(router).await?;
    Ok((format!("http://{addr}"), hits))
}

fn provider() -> anyhow::Result<SamlServiceProvider> {
    let http = crate::http_client(Duration::from_secs(5))?;
    Ok(SamlServiceProvider::new("http://localhost:2600/", http))
}

#[test]
fn acs_and_entity_id_derive_from_root() -> anyhow::Result<()> {
    let sp = provider()?;
    assert_eq!(sp.info().acs_url, "http://localhost:2600/sso/saml");
    assert_eq!(sp.info().entity_id, "http://localhost:2600/sso/saml");
    Ok(())
}

#[tokio::test]
async fn resolve_fetches_once_and_caches() -> anyhow::Result<()> {
    let (base, hits) = metadata_server().await?;
    let sp = provider()?;
    let url = format!("{base}/metadata");

    let first = sp.resolve(&url).await?;
    let second = sp.resolve(&url).await?;

    assert_eq!(first.entity_id, "http://www.okta.com/exk1");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(hits.load(Ordering::Relaxed), 1);
    Ok(())
}

#[tokio::test]
async fn resolve_surfaces_http_and_parse_failures() -> anyhow::Result<()> {
    let (base, _) = metadata_server().await?;
    let sp = provider()?;

    assert!(sp.resolve(&format!("{base}/missing")).await.is_err());
    crate::assert_err_contains!(sp.resolve(&format!("{base}/broken")).await, "IDPSSODescriptor");
    Ok(())
}

#[tokio::test]
async fn redirect_url_targets_idp_sso_location() -> anyhow::Result<()> {
    let (base, _) = metadata_server().await?;
    let sp = provider()?;
    let idp = sp.resolve(&format!("{base}/metadata")).await?;

    let url = sp.redirect_url(&idp, "relay")?;
    assert!(url.starts_with("https://idp.example/sso?SAMLRequest="));
    assert!(url.ends_with("&RelayState=relay"));
    Ok(())
}
