// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Insertion-ordered credential store and the refresh eligibility query.

use chrono::{DateTime, Duration, Utc};

use crate::credential::{Account, CredentialEntry};

/// Registry of credential entries, at most one per account id.
///
/// No I/O happens here. Callers wrap the store in a lock; see
/// [`crate::state::LlamaState`].
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    entries: Vec<CredentialEntry>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CredentialEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, account_id: &str) -> Option<&CredentialEntry> {
        self.entries.iter().find(|e| e.account_id == account_id)
    }

    /// Replace any entry with the same account id, appending the new one.
    pub fn upsert(&mut self, entry: CredentialEntry) {
        self.remove_by_account_id(&entry.account_id);
        self.entries.push(entry);
    }

    pub fn remove_by_account_id(&mut self, account_id: &str) {
        if let Some(idx) = self.entries.iter().position(|e| e.account_id == account_id) {
            self.entries.remove(idx);
        }
    }

    /// Entries that expire in less than `within_secs` from now.
    pub fn expiring_entries(&self, within_secs: i64) -> Vec<CredentialEntry> {
        self.expiring_entries_at(within_secs, Utc::now())
    }

    /// Same as [`Self::expiring_entries`] with an explicit clock sample.
    pub fn expiring_entries_at(
        &self,
        within_secs: i64,
        now: DateTime<Utc>,
    ) -> Vec<CredentialEntry> {
        self.expiring_iter(within_secs, now).cloned().collect()
    }

    /// `(metadata_url, expiration)` per entry, in store order.
    pub fn tracked(&self) -> Vec<(&str, DateTime<Utc>)> {
        self.entries.iter().map(|e| (e.metadata_url.as_str(), e.expiration)).collect()
    }

    pub fn contains_metadata_url(&self, metadata_url: &str) -> bool {
        self.entries.iter().any(|e| e.metadata_url == metadata_url)
    }

    fn expiring_iter(
        &self,
        within_secs: i64,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &CredentialEntry> {
        let window = Duration::seconds(within_secs);
        self.entries.iter().filter(move |e| e.expiration - now < window)
    }
}

/// Pick the metadata URL that should be authenticated next, if any.
///
/// Configured accounts with no entry win, in declaration order. Otherwise the
/// first expiring entry in store order is returned (not the soonest to
/// expire).
pub fn next_metadata_url_for_refresh(
    accounts: &[Account],
    store: &CredentialStore,
    renew_within_secs: i64,
    now: DateTime<Utc>,
) -> Option<String> {
    next_eligible(accounts, &store.tracked(), renew_within_secs, now, ChainLimit::default())
}

/// Constraints the callback chain adds on top of plain eligibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainLimit<'a> {
    /// Dropped from both rules.
    pub exclude: Option<&'a str>,
    /// Expiring entries qualify only when they expire before this instant.
    pub expiring_before: Option<DateTime<Utc>>,
}

/// Eligibility over `(metadata_url, expiration)` pairs in store order.
pub fn next_eligible(
    accounts: &[Account],
    tracked: &[(&str, DateTime<Utc>)],
    renew_within_secs: i64,
    now: DateTime<Utc>,
    limit: ChainLimit<'_>,
) -> Option<String> {
    let allowed = |url: &str| limit.exclude != Some(url);

    if let Some(account) = accounts.iter().find(|a| {
        allowed(&a.metadata_url) && !tracked.iter().any(|(url, _)| *url == a.metadata_url)
    }) {
        return Some(account.metadata_url.clone());
    }

    let window = Duration::seconds(renew_within_secs);
    tracked
        .iter()
        .find(|(url, expiration)| {
            allowed(url)
                && *expiration - now < window
                && limit.expiring_before.map_or(true, |cutoff| *expiration < cutoff)
        })
        .map(|(url, _)| (*url).to_owned())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
