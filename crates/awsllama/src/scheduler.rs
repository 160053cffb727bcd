// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background refresh loop driving the browser authenticator.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::{AuthMode, Authenticator};
use crate::state::LlamaState;

/// Result of a single refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing is eligible for refresh.
    Idle,
    /// Another authentication run holds the guard.
    Busy,
    Refreshed(AuthMode),
    Failed(String),
}

/// Run the authenticator once if any account is eligible.
pub async fn run_once(state: &LlamaState, authenticator: &Authenticator) -> RefreshOutcome {
    let Ok(_guard) = state.auth_guard.try_lock() else {
        debug!("authentication already in progress");
        return RefreshOutcome::Busy;
    };
    let next = state.next_metadata_url_for_refresh().await;
    authenticate_for(state, authenticator, next).await
}

/// Like [`run_once`], with eligibility decided by the caller (for example
/// from another process's index).
pub async fn run_with(
    state: &LlamaState,
    authenticator: &Authenticator,
    next: Option<String>,
) -> RefreshOutcome {
    let Ok(_guard) = state.auth_guard.try_lock() else {
        debug!("authentication already in progress");
        return RefreshOutcome::Busy;
    };
    authenticate_for(state, authenticator, next).await
}

async fn authenticate_for(
    state: &LlamaState,
    authenticator: &Authenticator,
    next: Option<String>,
) -> RefreshOutcome {
    let Some(metadata_url) = next else {
        debug!("no credentials need refreshing");
        return RefreshOutcome::Idle;
    };

    info!(metadata_url = %metadata_url, "credentials need refreshing, starting browser login");
    match authenticator.authenticate(&state.shutdown).await {
        Ok(mode) => {
            info!(?mode, "browser login finished");
            RefreshOutcome::Refreshed(mode)
        }
        Err(e) => {
            warn!(err = %e, "browser login failed");
            RefreshOutcome::Failed(e.to_string())
        }
    }
}

/// Spawn the periodic refresh task. The first tick fires immediately; ticks
/// missed while a login is running are skipped.
pub fn spawn_refresh_loop(
    state: Arc<LlamaState>,
    authenticator: Arc<Authenticator>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }
            run_once(&state, &authenticator).await;
        }
        debug!("refresh loop stopped");
    })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
