// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `awsllama status`: print what a running server holds.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::credential::store;
use crate::credential::CredentialSummary;
use crate::transport::http::IndexResponse;

fn format_expires(expiration: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (expiration - now).num_seconds();
    if secs <= 0 {
        return "expired".to_owned();
    }
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m {s:02}s")
    }
}

/// Render the account table, one row per summary in server order.
pub fn render_table(rows: &[CredentialSummary], now: DateTime<Utc>) -> String {
    if rows.is_empty() {
        return "no credentials yet\n".to_owned();
    }
    let id_w = rows.iter().map(|r| r.account_id.len()).max().unwrap_or(0).max(7);
    let nick_w = rows
        .iter()
        .filter_map(|r| r.nickname.as_deref())
        .map(str::len)
        .max()
        .unwrap_or(0)
        .max(8);

    let mut out = String::new();
    let _ = writeln!(out, "{:<id_w$}  {:<nick_w$}  {}", "ACCOUNT", "NICKNAME", "EXPIRES IN");
    for row in rows {
        let _ = writeln!(
            out,
            "{:<id_w$}  {:<nick_w$}  {}",
            row.account_id,
            row.nickname.as_deref().unwrap_or("-"),
            format_expires(row.expiration, now)
        );
    }
    out
}

pub async fn fetch(client: &reqwest::Client, base_url: &str) -> anyhow::Result<IndexResponse> {
    let resp = client.get(format!("{}/", base_url.trim_end_matches('/'))).send().await?;
    let resp = resp.error_for_status()?;
    Ok(resp.json().await?)
}

/// Refresh eligibility as seen by a running server's index.
pub fn next_metadata_url_from_index(
    settings: &Settings,
    index: &IndexResponse,
    now: DateTime<Utc>,
) -> Option<String> {
    let tracked: Vec<(&str, DateTime<Utc>)> = index
        .credentials
        .iter()
        .map(|c| (c.metadata_url.as_str(), c.expiration))
        .collect();
    store::next_eligible(
        &settings.accounts,
        &tracked,
        settings.renew_within_secs,
        now,
        store::ChainLimit::default(),
    )
}

pub async fn remote_next_metadata_url(
    settings: &Settings,
    base_url: &str,
) -> anyhow::Result<Option<String>> {
    let client = crate::http_client(Duration::from_secs(5))?;
    let index = fetch(&client, base_url).await?;
    Ok(next_metadata_url_from_index(settings, &index, Utc::now()))
}

/// Returns the process exit code.
pub async fn run(base_url: &str) -> i32 {
    let index = match crate::http_client(Duration::from_secs(5)) {
        Ok(client) => fetch(&client, base_url).await,
        Err(e) => Err(e),
    };
    match index {
        Ok(index) => {
            print!("{}", render_table(&index.credentials, Utc::now()));
            0
        }
        Err(e) => {
            eprintln!("error: could not reach awsllama at {base_url}: {e:#}");
            1
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
