// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::routing::get;
use axum::{Json, Router};

use super::*;
use crate::test_support::{spawn_stub_server, test_settings};

fn summary(id: &str, nickname: Option<&str>, expiration: DateTime<Utc>) -> CredentialSummary {
    CredentialSummary {
        account_id: id.to_owned(),
        expiration,
        metadata_url: format!("https://idp.test/{id}/metadata"),
        nickname: nickname.map(str::to_owned),
    }
}

#[yare::parameterized(
    hours   = { 7260, "2h 01m" },
    minutes = { 125, "2m 05s" },
    expired = { -1, "expired" },
)]
fn expires_formatting(secs: i64, expected: &str) {
    let now = Utc::now();
    assert_eq!(format_expires(now + chrono::Duration::seconds(secs), now), expected);
}

#[test]
fn table_lists_rows_in_order() {
    let now = Utc::now();
    let table = render_table(
        &[
            summary("111111111111", Some("Dev"), now + chrono::Duration::seconds(600)),
            summary("222222222222", None, now - chrono::Duration::seconds(5)),
        ],
        now,
    );
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ACCOUNT"));
    assert!(lines[1].starts_with("111111111111  Dev"));
    assert!(lines[1].ends_with("10m 00s"));
    assert!(lines[2].contains("-"));
    assert!(lines[2].ends_with("expired"));
}

#[test]
fn empty_table() {
    assert_eq!(render_table(&[], Utc::now()), "no credentials yet\n");
}

#[tokio::test]
async fn fetch_reads_index() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/",
        get(|| async {
            Json(serde_json::json!({
                "credentials": [
                    { "account_id": "111111111111", "expiration": "2026-10-16T13:34:41Z", "nickname": "Dev" }
                ]
            }))
        }),
    );
    let (addr, _handle) = spawn_stub_server(router).await?;

    let client = crate::http_client(std::time::Duration::from_secs(5))?;
    let index = fetch(&client, &format!("http://{addr}")).await?;
    assert_eq!(index.credentials.len(), 1);
    assert_eq!(index.credentials[0].nickname.as_deref(), Some("Dev"));
    Ok(())
}

#[test]
fn index_eligibility_uses_server_view() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = "https://idp.test/111111111111/metadata";
    let b = "https://idp.test/222222222222/metadata";
    let settings = test_settings(dir.path(), &[a, b])?;
    let now = Utc::now();

    let mut index = IndexResponse {
        credentials: vec![summary("111111111111", None, now + chrono::Duration::hours(1))],
    };
    assert_eq!(next_metadata_url_from_index(&settings, &index, now).as_deref(), Some(b));

    index.credentials.push(summary("222222222222", None, now + chrono::Duration::hours(1)));
    assert_eq!(next_metadata_url_from_index(&settings, &index, now), None);

    index.credentials[0].expiration = now + chrono::Duration::seconds(60);
    assert_eq!(next_metadata_url_from_index(&settings, &index, now).as_deref(), Some(a));
    Ok(())
}

#[tokio::test]
async fn remote_eligibility_reads_running_server() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/",
        get(|| async {
            Json(serde_json::json!({
                "credentials": [{
                    "account_id": "111111111111",
                    "expiration": "2999-01-01T00:00:00Z",
                    "metadata_url": "https://idp.test/111111111111/metadata"
                }]
            }))
        }),
    );
    let (addr, _handle) = spawn_stub_server(router).await?;
    let dir = tempfile::tempdir()?;
    let settings = test_settings(dir.path(), &["https://idp.test/111111111111/metadata"])?;

    let next = remote_next_metadata_url(&settings, &format!("http://{addr}")).await?;
    assert_eq!(next, None);
    Ok(())
}
