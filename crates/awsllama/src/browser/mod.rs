// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser automation that walks the local `/login` flow until the IdP
//! redirect chain lands back on the server root.

pub mod auth;
pub mod playwright;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::BoxFuture;

pub use auth::{AuthError, AuthMode, Authenticator};
pub use playwright::PlaywrightEngine;

/// Navigation completion condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// Persistent-context launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_data_dir: PathBuf,
    pub channel: String,
}

/// A single browser session: one persistent context with one page.
///
/// Object-safe so the authentication state machine can run against a fake.
pub trait BrowserEngine: Send {
    fn launch<'a>(&'a mut self, options: &'a LaunchOptions) -> BoxFuture<'a, anyhow::Result<()>>;

    fn navigate<'a>(
        &'a mut self,
        url: &'a str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<()>>;

    fn current_url(&mut self) -> BoxFuture<'_, anyhow::Result<String>>;

    /// `Ok(false)` when `timeout` elapses first.
    fn wait_for_url<'a>(
        &'a mut self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;

    /// `Ok(false)` when `timeout` elapses first.
    fn wait_for_selector<'a>(
        &'a mut self,
        selector: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;

    fn fill<'a>(
        &'a mut self,
        selector: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>>;

    fn click<'a>(&'a mut self, selector: &'a str) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Tear down page, context, browser, and engine. Safe to call repeatedly.
    fn close(&mut self) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Creates a fresh engine per attempt.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn BrowserEngine> + Send + Sync>;
