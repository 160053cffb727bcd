// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: builders, fakes, and assertion helpers.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserEngine, EngineFactory, LaunchOptions, WaitUntil};
use crate::config::{Config, FileConfig, Settings};
use crate::credential::{Account, Credential, CredentialEntry};
use crate::saml::metadata::SsoService;
use crate::saml::response::SamlAttribute;
use crate::saml::{
    IdentityProvider, IdpMetadata, SamlAssertion, AWS_ROLE_ATTRIBUTE, HTTP_REDIRECT_BINDING,
};
use crate::state::LlamaState;
use crate::sts::{AssumedRole, CredentialExchange};
use crate::BoxFuture;

/// Assert that an expression returns `Err` whose message contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

pub fn account(metadata_url: &str) -> Account {
    Account { metadata_url: metadata_url.to_owned(), nickname: String::new() }
}

/// Entry for `account_id` expiring `secs` from now (negative: already expired).
pub fn entry_expiring_in(account_id: &str, metadata_url: &str, secs: i64) -> CredentialEntry {
    CredentialEntry {
        account_id: account_id.to_owned(),
        credential: Credential {
            access_key_id: format!("ASIA{account_id}"),
            secret_access_key: format!("secret-{account_id}"),
            session_token: None,
            security_token: None,
        },
        metadata_url: metadata_url.to_owned(),
        expiration: Utc::now() + chrono::Duration::seconds(secs),
    }
}

/// One `[name]` section of an INI-style credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub values: Vec<(String, String)>,
}

impl Profile {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Minimal reader for the credentials file, skipping `;`/`#` comments.
pub fn parse_profiles(contents: &str) -> Vec<Profile> {
    let mut profiles: Vec<Profile> = Vec::new();
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            profiles.push(Profile { name: name.to_owned(), values: Vec::new() });
        } else if let (Some((key, value)), Some(profile)) =
            (line.split_once('='), profiles.last_mut())
        {
            profile.values.push((key.trim().to_owned(), value.trim().to_owned()));
        }
    }
    profiles
}

/// Validated settings for `metadata_urls`, with every path under `dir`.
pub fn test_settings(dir: &Path, metadata_urls: &[&str]) -> anyhow::Result<Settings> {
    let file = FileConfig {
        accounts: metadata_urls.iter().map(|u| account(u)).collect(),
        ..FileConfig::default()
    };
    Settings::from_parts(&Config::test(dir), file)
}

pub fn test_state(
    settings: Settings,
    idp: Arc<dyn IdentityProvider>,
    sts: Arc<dyn CredentialExchange>,
) -> Arc<LlamaState> {
    Arc::new(LlamaState::new(settings, idp, sts, CancellationToken::new()))
}

/// Spawn a router on a random local port.
pub async fn spawn_stub_server(
    router: axum::Router,
) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle))
}

/// Base64 `SAMLResponse` that [`FakeIdp`] decodes into one role value per line.
pub fn saml_response_for(role_values: &[&str]) -> String {
    STANDARD.encode(role_values.join("\n"))
}

/// [`IdentityProvider`] that knows a fixed set of metadata URLs.
///
/// The "response document" is plain text: each line becomes a value of the
/// AWS role attribute. Documents starting with `<garbage` fail to parse.
pub struct FakeIdp {
    known: Vec<String>,
    resolves: AtomicU32,
}

impl FakeIdp {
    pub fn new(known: &[&str]) -> Self {
        Self { known: known.iter().map(|s| (*s).to_owned()).collect(), resolves: AtomicU32::new(0) }
    }

    pub fn resolve_count(&self) -> u32 {
        self.resolves.load(Ordering::Relaxed)
    }
}

impl IdentityProvider for FakeIdp {
    fn resolve<'a>(
        &'a self,
        metadata_url: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<IdpMetadata>>> {
        Box::pin(async move {
            self.resolves.fetch_add(1, Ordering::Relaxed);
            if !self.known.iter().any(|k| k == metadata_url) {
                anyhow::bail!("no metadata at {metadata_url}");
            }
            Ok(Arc::new(IdpMetadata {
                entity_id: metadata_url.to_owned(),
                sso_services: vec![SsoService {
                    binding: HTTP_REDIRECT_BINDING.to_owned(),
                    location: "https://idp.test/sso".to_owned(),
                }],
            }))
        })
    }

    fn redirect_url(&self, idp: &IdpMetadata, relay_state: &str) -> anyhow::Result<String> {
        let location = idp.redirect_location()?;
        let url = url::Url::parse_with_params(location, &[("RelayState", relay_state)])?;
        Ok(url.into())
    }

    fn parse_response(&self, idp: &IdpMetadata, xml: &[u8]) -> anyhow::Result<SamlAssertion> {
        let text = std::str::from_utf8(xml)?;
        if text.starts_with("<garbage") {
            anyhow::bail!("not a SAML response");
        }
        let values = text.lines().filter(|l| !l.is_empty()).map(str::to_owned).collect();
        Ok(SamlAssertion {
            issuer: Some(idp.entity_id.clone()),
            attributes: vec![SamlAttribute { name: AWS_ROLE_ATTRIBUTE.to_owned(), values }],
        })
    }
}

/// One recorded STS call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StsCall {
    pub provider_arn: String,
    pub role_arn: String,
    pub assertion: String,
}

/// [`CredentialExchange`] that mints credentials from the role ARN.
///
/// The assumed-role ARN reuses the role's account field; a role ARN with too
/// few fields is echoed back unchanged (and so is malformed).
#[derive(Default)]
pub struct FakeSts {
    failing_roles: Vec<String>,
    calls: tokio::sync::Mutex<Vec<StsCall>>,
}

impl FakeSts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(roles: &[&str]) -> Self {
        Self { failing_roles: roles.iter().map(|s| (*s).to_owned()).collect(), ..Self::default() }
    }

    pub async fn calls(&self) -> Vec<StsCall> {
        self.calls.lock().await.clone()
    }
}

impl CredentialExchange for FakeSts {
    fn assume_role_with_saml<'a>(
        &'a self,
        provider_arn: &'a str,
        role_arn: &'a str,
        assertion: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<AssumedRole>> {
        Box::pin(async move {
            self.calls.lock().await.push(StsCall {
                provider_arn: provider_arn.to_owned(),
                role_arn: role_arn.to_owned(),
                assertion: assertion.to_owned(),
            });
            if self.failing_roles.iter().any(|r| r == role_arn) {
                anyhow::bail!("AccessDenied: not authorized to assume {role_arn}");
            }

            let fields: Vec<&str> = role_arn.split(':').collect();
            let (assumed_role_arn, account) = match fields.get(4) {
                Some(account) if fields.len() >= 6 => {
                    let role = fields[5].trim_start_matches("role/");
                    let arn =
                        format!("arn:aws:sts::{account}:assumed-role/{role}/user@example.com");
                    (arn, *account)
                }
                _ => (role_arn.to_owned(), "unknown"),
            };
            Ok(AssumedRole {
                credential: Credential {
                    access_key_id: format!("ASIA{account}"),
                    secret_access_key: format!("secret-{account}"),
                    session_token: Some(format!("token-{account}")),
                    security_token: None,
                },
                assumed_role_arn,
                expiration: Utc::now() + chrono::Duration::hours(1),
            })
        })
    }
}

/// Call log shared between a test and the engines it creates.
#[derive(Debug, Clone, Default)]
pub struct BrowserLog(Arc<Mutex<Vec<String>>>);

impl BrowserLog {
    fn push(&self, entry: String) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// Behaviour of [`FakeBrowser`] sessions.
#[derive(Debug, Clone, Default)]
pub struct BrowserScript {
    /// URL a headless session ends on; `None` makes headless navigation fail.
    pub headless_lands_on: Option<String>,
    /// Whether the visible session reaches the awaited URL.
    pub interactive_completes: bool,
    pub fail_launch: bool,
    /// Selectors present on the visible login page.
    pub selectors: Vec<String>,
    /// Selector whose click fails.
    pub broken_click: Option<String>,
    /// Navigation never finishes.
    pub hang: bool,
}

pub struct FakeBrowser {
    script: BrowserScript,
    log: BrowserLog,
    headless: bool,
}

impl FakeBrowser {
    pub fn factory(script: BrowserScript, log: BrowserLog) -> EngineFactory {
        Arc::new(move || {
            Box::new(FakeBrowser { script: script.clone(), log: log.clone(), headless: true })
                as Box<dyn BrowserEngine>
        })
    }
}

impl BrowserEngine for FakeBrowser {
    fn launch<'a>(&'a mut self, options: &'a LaunchOptions) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.headless = options.headless;
            let mode = if options.headless { "headless" } else { "visible" };
            self.log.push(format!("launch {mode}"));
            if self.script.fail_launch {
                anyhow::bail!("chrome not installed");
            }
            Ok(())
        })
    }

    fn navigate<'a>(
        &'a mut self,
        url: &'a str,
        _wait_until: WaitUntil,
        _timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(format!("navigate {url}"));
            if self.script.hang {
                std::future::pending::<()>().await;
            }
            if self.headless && self.script.headless_lands_on.is_none() {
                anyhow::bail!("net::ERR_ABORTED");
            }
            Ok(())
        })
    }

    fn current_url(&mut self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async move {
            self.log.push("current_url".to_owned());
            Ok(self.script.headless_lands_on.clone().unwrap_or_default())
        })
    }

    fn wait_for_url<'a>(
        &'a mut self,
        url: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            self.log.push(format!("wait_for_url {url}"));
            Ok(self.script.interactive_completes)
        })
    }

    fn wait_for_selector<'a>(
        &'a mut self,
        selector: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            self.log.push(format!("wait_for_selector {selector}"));
            Ok(self.script.selectors.iter().any(|s| s == selector))
        })
    }

    fn fill<'a>(
        &'a mut self,
        selector: &'a str,
        _value: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(format!("fill {selector}"));
            Ok(())
        })
    }

    fn click<'a>(&'a mut self, selector: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(format!("click {selector}"));
            if self.script.broken_click.as_deref() == Some(selector) {
                anyhow::bail!("element not clickable: {selector}");
            }
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push("close".to_owned());
            Ok(())
        })
    }
}
