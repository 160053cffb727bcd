// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::credential::persist::CredentialsFile;
use crate::credential::store::{self, CredentialStore};
use crate::credential::{CredentialEntry, CredentialSummary};
use crate::saml::IdentityProvider;
use crate::sts::CredentialExchange;

/// Shared state for the HTTP server and the refresh scheduler.
pub struct LlamaState {
    pub settings: Settings,
    pub store: RwLock<CredentialStore>,
    /// Held across snapshot-and-write so the file always reflects the
    /// latest store.
    writer: Mutex<CredentialsFile>,
    pub idp: Arc<dyn IdentityProvider>,
    pub sts: Arc<dyn CredentialExchange>,
    /// Serializes browser authentication runs (scheduler ticks and `refresh`).
    pub auth_guard: Mutex<()>,
    pub shutdown: CancellationToken,
}

impl LlamaState {
    pub fn new(
        settings: Settings,
        idp: Arc<dyn IdentityProvider>,
        sts: Arc<dyn CredentialExchange>,
        shutdown: CancellationToken,
    ) -> Self {
        let writer = CredentialsFile::new(settings.credentials_path.clone());
        Self {
            settings,
            store: RwLock::new(CredentialStore::new()),
            writer: Mutex::new(writer),
            idp,
            sts,
            auth_guard: Mutex::new(()),
            shutdown,
        }
    }

    /// Metadata URL that should be authenticated next, if any.
    pub async fn next_metadata_url_for_refresh(&self) -> Option<String> {
        let store = self.store.read().await;
        store::next_metadata_url_for_refresh(
            &self.settings.accounts,
            &store,
            self.settings.renew_within_secs,
            Utc::now(),
        )
    }

    /// Eligibility for the callback chain.
    ///
    /// `just_refreshed` is never offered again, and an expiring entry is only
    /// offered when renewing it would gain at least one refresh interval over
    /// what it has now. Credentials issued earlier in the same walk therefore
    /// stop the chain even when the renewal window exceeds their lifetime.
    pub async fn next_metadata_url_after(&self, just_refreshed: &str) -> Option<String> {
        let store = self.store.read().await;
        let tracked = store.tracked();
        let renewed_until =
            tracked.iter().filter(|(url, _)| *url == just_refreshed).map(|(_, exp)| *exp).max();
        let gap = chrono::Duration::from_std(self.settings.refresh_interval).ok();
        let limit = store::ChainLimit {
            exclude: Some(just_refreshed),
            expiring_before: renewed_until.zip(gap).map(|(until, gap)| until - gap),
        };
        store::next_eligible(
            &self.settings.accounts,
            &tracked,
            self.settings.renew_within_secs,
            Utc::now(),
            limit,
        )
    }

    pub async fn upsert(&self, entry: CredentialEntry) {
        self.store.write().await.upsert(entry);
    }

    /// Write the whole store to the credentials file.
    pub async fn persist(&self) -> anyhow::Result<()> {
        let writer = self.writer.lock().await;
        let entries = self.store.read().await.entries().to_vec();
        writer.store_credentials(&entries)?;
        tracing::debug!(
            path = %writer.path().display(),
            count = entries.len(),
            "credentials file written"
        );
        Ok(())
    }

    /// Index rows in store order.
    pub async fn summaries(&self) -> Vec<CredentialSummary> {
        let store = self.store.read().await;
        store
            .entries()
            .iter()
            .map(|e| CredentialSummary {
                account_id: e.account_id.clone(),
                expiration: e.expiration,
                metadata_url: e.metadata_url.clone(),
                nickname: self.settings.nickname_for(&e.metadata_url).map(str::to_owned),
            })
            .collect()
    }
}
