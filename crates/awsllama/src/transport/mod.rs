// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local HTTP surface: index, login redirect, and the SAML callback.

pub mod http;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::saml::provider::ACS_PATH;
use crate::state::LlamaState;

/// Build the axum `Router` with all routes.
pub fn build_router(state: Arc<LlamaState>) -> Router {
    Router::new()
        .route("/", get(http::index))
        .route("/login", get(http::login))
        .route(ACS_PATH, post(http::sso_saml))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Whether something already accepts connections on `addr`.
pub async fn is_server_running(addr: SocketAddr) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_secs(1), tokio::net::TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}
