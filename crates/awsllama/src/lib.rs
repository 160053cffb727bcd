// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! awsllama: keeps short-lived AWS credentials for SSO-backed accounts fresh
//! by driving a browser through the IdP login and exchanging the resulting
//! SAML assertions with STS.

pub mod browser;
pub mod config;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod saml;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod status;
pub mod sts;
pub mod test_support;
pub mod transport;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::browser::{Authenticator, BrowserEngine, EngineFactory, PlaywrightEngine};
use crate::config::Settings;
use crate::saml::SamlServiceProvider;
use crate::scheduler::RefreshOutcome;
use crate::state::LlamaState;
use crate::sts::StsClient;
use crate::transport::build_router;

/// Boxed future returned by the object-safe collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shared outbound client (IdP metadata, status).
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Wire the production collaborators into shared state.
pub async fn build_runtime(
    settings: Settings,
    shutdown: CancellationToken,
) -> anyhow::Result<(Arc<LlamaState>, Arc<Authenticator>)> {
    let timeout = Duration::from_secs(30);
    let idp = Arc::new(SamlServiceProvider::new(&settings.root_url, http_client(timeout)?));
    let sts = Arc::new(StsClient::new(timeout).await);

    let bridge = settings.browser_bridge.clone();
    let factory: EngineFactory = Arc::new(move || {
        Box::new(PlaywrightEngine::new(bridge.clone())) as Box<dyn BrowserEngine>
    });
    let authenticator = Arc::new(Authenticator::new(&settings, factory));

    let state = Arc::new(LlamaState::new(settings, idp, sts, shutdown));
    Ok((state, authenticator))
}

fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        shutdown.cancel();
    });
}

async fn spawn_server(state: Arc<LlamaState>) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let addr = state.settings.listen_addr;
    let listener = TcpListener::bind(addr).await?;
    info!("awsllama listening on {addr} ({} accounts)", state.settings.accounts.len());

    let shutdown = state.shutdown.clone();
    let router = build_router(state);
    Ok(tokio::spawn(async move {
        let serve =
            axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned());
        if let Err(e) = serve.await {
            tracing::error!(err = %e, "server stopped");
        }
    }))
}

/// Run the server and the refresh scheduler until interrupted.
pub async fn run_serve(settings: Settings) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let interval = settings.refresh_interval;
    let (state, authenticator) = build_runtime(settings, shutdown.clone()).await?;
    let server = spawn_server(Arc::clone(&state)).await?;
    let refresh = scheduler::spawn_refresh_loop(state, authenticator, interval);

    let _ = server.await;
    shutdown.cancel();
    let _ = refresh.await;
    Ok(())
}

/// One-shot refresh. Starts a server in-process when none is listening;
/// otherwise eligibility comes from the running server's index, since the
/// authentication guard only covers this process.
pub async fn run_refresh(settings: Settings) -> anyhow::Result<RefreshOutcome> {
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let addr = settings.listen_addr;
    let (state, authenticator) = build_runtime(settings, shutdown.clone()).await?;

    let outcome = if transport::is_server_running(addr).await {
        info!("server already running on {addr}");
        let base_url = format!("http://{addr}");
        let next = status::remote_next_metadata_url(&state.settings, &base_url).await?;
        scheduler::run_with(&state, &authenticator, next).await
    } else {
        info!("server not running, starting one");
        let server = spawn_server(Arc::clone(&state)).await?;
        let outcome = scheduler::run_once(&state, &authenticator).await;
        shutdown.cancel();
        let _ = server.await;
        outcome
    };
    shutdown.cancel();

    match outcome {
        RefreshOutcome::Failed(msg) => anyhow::bail!("refresh failed: {msg}"),
        other => Ok(other),
    }
}
