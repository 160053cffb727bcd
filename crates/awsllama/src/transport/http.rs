// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::credential::CredentialSummary;
use crate::error::ErrorCode;
use crate::exchange::{self, ExchangeError};
use crate::state::LlamaState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub metadata_url: Option<String>,
}

/// Form posted by the IdP to the assertion consumer service.
#[derive(Debug, Deserialize)]
pub struct SamlCallback {
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
    #[serde(rename = "RelayState", default)]
    pub relay_state: String,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /`
pub async fn index(State(s): State<Arc<LlamaState>>) -> impl IntoResponse {
    Json(IndexResponse { credentials: s.summaries().await })
}

/// `GET /login?metadata_url=...`
pub async fn login(State(s): State<Arc<LlamaState>>, Query(q): Query<LoginQuery>) -> Response {
    match exchange::initiate_login(&s, q.metadata_url.as_deref()).await {
        Ok(action) => found(action.location()),
        Err(e) => exchange_error(e),
    }
}

/// `POST /sso/saml`
pub async fn sso_saml(
    State(s): State<Arc<LlamaState>>,
    form: Result<Form<SamlCallback>, FormRejection>,
) -> Response {
    let Form(body) = match form {
        Ok(form) => form,
        Err(e) => {
            return ErrorCode::BadRequest.to_http_response(format!("failed to read form body: {e}"))
        }
    };

    match exchange::handle_assertion(&s, &body.saml_response, &body.relay_state).await {
        Ok(next) => found(&next.location()),
        Err(e) => exchange_error(e),
    }
}

fn exchange_error(e: ExchangeError) -> Response {
    let code = e.code();
    tracing::warn!(code = %code, err = %e, "SSO request failed");
    code.to_http_response(e.to_string())
}

/// 302 with `Location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}
