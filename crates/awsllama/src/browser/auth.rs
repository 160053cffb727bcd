// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Headless-then-interactive authentication driver.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::{BrowserEngine, EngineFactory, LaunchOptions, WaitUntil};
use crate::config::{LoginCredentials, Settings};

const USERNAME_SELECTOR: &str = "#okta-signin-username";
const PASSWORD_SELECTOR: &str = "#okta-signin-password";
const REMEMBER_SELECTOR: &str = "input[name=\"remember\"]";
const SUBMIT_SELECTOR: &str = "#okta-signin-submit";
const PUSH_SELECTOR: &str = "input[value=\"Send Push\"]";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("timed out after {0:?} waiting for the login flow to finish")]
    Timeout(Duration),
    #[error("authentication cancelled")]
    Cancelled,
    #[error("browser engine error: {0}")]
    Engine(String),
}

/// How a successful run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Headless,
    Interactive,
}

#[derive(Debug)]
enum AuthState {
    Idle,
    HeadlessAttempt,
    NeedsInteractive,
    InteractiveAttempt,
    Success(AuthMode),
    Failed(AuthError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    /// Per navigation.
    pub navigation: Duration,
    /// Waiting for a login form element to appear.
    pub selector: Duration,
    /// Waiting for the user to finish an interactive login.
    pub interactive: Duration,
}

impl Default for AuthTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            selector: Duration::from_secs(5),
            interactive: Duration::from_secs(5 * 60),
        }
    }
}

pub struct Authenticator {
    factory: EngineFactory,
    root_url: String,
    user_data_dir: PathBuf,
    channel: String,
    login: Option<LoginCredentials>,
    timeouts: AuthTimeouts,
}

impl Authenticator {
    pub fn new(settings: &Settings, factory: EngineFactory) -> Self {
        Self {
            factory,
            root_url: settings.root_url.trim_end_matches('/').to_owned(),
            user_data_dir: settings.browser_data_dir.clone(),
            channel: settings.browser_channel.clone(),
            login: settings.login.clone(),
            timeouts: AuthTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: AuthTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn login_url(&self) -> String {
        format!("{}/login", self.root_url)
    }

    /// The URL the flow ends on once nothing is left to refresh.
    fn home_url(&self) -> String {
        format!("{}/", self.root_url)
    }

    /// Run one authentication: headless first, visible browser on any
    /// headless failure. Cancellation stops either attempt.
    pub async fn authenticate(&self, cancel: &CancellationToken) -> Result<AuthMode, AuthError> {
        let mut state = AuthState::Idle;
        loop {
            debug!(?state, "auth state");
            state = match state {
                AuthState::Idle => AuthState::HeadlessAttempt,
                AuthState::HeadlessAttempt => match self.attempt(true, cancel).await {
                    Ok(()) => AuthState::Success(AuthMode::Headless),
                    Err(AuthError::Cancelled) => AuthState::Failed(AuthError::Cancelled),
                    Err(e) => {
                        info!(err = %e, "headless login did not complete, opening browser");
                        AuthState::NeedsInteractive
                    }
                },
                AuthState::NeedsInteractive => AuthState::InteractiveAttempt,
                AuthState::InteractiveAttempt => match self.attempt(false, cancel).await {
                    Ok(()) => AuthState::Success(AuthMode::Interactive),
                    Err(e) => AuthState::Failed(e),
                },
                AuthState::Success(mode) => return Ok(mode),
                AuthState::Failed(e) => return Err(e),
            };
        }
    }

    /// One browser session. The engine is closed on every path.
    async fn attempt(&self, headless: bool, cancel: &CancellationToken) -> Result<(), AuthError> {
        let mut engine = (self.factory)();
        let result = tokio::select! {
            r = self.drive(engine.as_mut(), headless) => r,
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
        };
        if let Err(e) = engine.close().await {
            warn!(err = %e, "failed to close browser");
        }
        result
    }

    async fn drive(&self, engine: &mut dyn BrowserEngine, headless: bool) -> Result<(), AuthError> {
        let options = LaunchOptions {
            headless,
            user_data_dir: self.user_data_dir.clone(),
            channel: self.channel.clone(),
        };
        engine.launch(&options).await.map_err(|e| AuthError::Launch(format!("{e:#}")))?;

        let login_url = self.login_url();
        let home_url = self.home_url();

        if headless {
            engine
                .navigate(&login_url, WaitUntil::NetworkIdle, self.timeouts.navigation)
                .await
                .map_err(|e| AuthError::Navigation(format!("{e:#}")))?;
            let landed =
                engine.current_url().await.map_err(|e| AuthError::Engine(format!("{e:#}")))?;
            if landed != home_url {
                return Err(AuthError::Navigation(format!("headless session stopped at {landed}")));
            }
            return Ok(());
        }

        engine
            .navigate(&login_url, WaitUntil::DomContentLoaded, self.timeouts.navigation)
            .await
            .map_err(|e| AuthError::Navigation(format!("{e:#}")))?;
        if let Some(ref login) = self.login {
            if let Err(e) = self.autofill(engine, login).await {
                warn!(err = %e, "login form auto-fill failed");
            }
        }

        let done = engine
            .wait_for_url(&home_url, self.timeouts.interactive)
            .await
            .map_err(|e| AuthError::Engine(format!("{e:#}")))?;
        if !done {
            return Err(AuthError::Timeout(self.timeouts.interactive));
        }
        Ok(())
    }

    /// Best effort: fill and submit a recognized login form, then request a
    /// push verification if offered.
    async fn autofill(
        &self,
        engine: &mut dyn BrowserEngine,
        login: &LoginCredentials,
    ) -> anyhow::Result<()> {
        let wait = self.timeouts.selector;
        if !engine.wait_for_selector(USERNAME_SELECTOR, wait).await? {
            debug!("no recognizable login form");
            return Ok(());
        }
        engine.fill(USERNAME_SELECTOR, &login.username).await?;
        engine.fill(PASSWORD_SELECTOR, &login.password).await?;
        if engine.wait_for_selector(REMEMBER_SELECTOR, wait).await? {
            if let Err(e) = engine.click(REMEMBER_SELECTOR).await {
                debug!(err = %e, "remember-me checkbox not clickable");
            }
        }
        engine.click(SUBMIT_SELECTOR).await?;

        if engine.wait_for_selector(PUSH_SELECTOR, wait).await? {
            engine.click(PUSH_SELECTOR).await?;
            info!("push verification requested");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
