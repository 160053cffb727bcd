// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use super::*;

#[test]
fn requests_are_tagged_json_lines() -> anyhow::Result<()> {
    let line = encode_request(
        7,
        BridgeCommand::Navigate {
            url: "http://localhost:2600/login",
            wait_until: WaitUntil::NetworkIdle,
            timeout_ms: 1500,
        },
    )?;
    assert!(line.ends_with('\n'));

    let value: serde_json::Value = serde_json::from_str(line.trim_end())?;
    assert_eq!(
        value,
        serde_json::json!({
            "id": 7,
            "op": "navigate",
            "url": "http://localhost:2600/login",
            "wait_until": "networkidle",
            "timeout_ms": 1500,
        })
    );
    Ok(())
}

#[test]
fn launch_carries_profile_dir() -> anyhow::Result<()> {
    let dir = PathBuf::from("/tmp/awsllama-chrome");
    let line = encode_request(
        1,
        BridgeCommand::Launch { headless: true, user_data_dir: &dir, channel: "chrome" },
    )?;
    let value: serde_json::Value = serde_json::from_str(&line)?;
    assert_eq!(value["op"], "launch");
    assert_eq!(value["user_data_dir"], "/tmp/awsllama-chrome");
    assert_eq!(value["headless"], true);
    Ok(())
}

#[yare::parameterized(
    unit_op = { BridgeCommand::CurrentUrl, "current_url" },
    close   = { BridgeCommand::Close, "close" },
    click   = { BridgeCommand::Click { selector: "#go" }, "click" },
)]
fn op_names(command: BridgeCommand<'static>, op: &str) {
    let line = encode_request(1, command).unwrap_or_default();
    assert!(line.contains(&format!("\"op\":\"{op}\"")), "{line}");
}

#[test]
fn decode_matches_id_and_skips_noise() -> anyhow::Result<()> {
    assert_eq!(decode_reply("Debugger attached.", 3)?, None);
    assert_eq!(decode_reply(r#"{"id":2,"ok":true,"result":"x"}"#, 3)?, None);
    assert_eq!(
        decode_reply(r#"{"id":3,"ok":true,"result":"http://localhost:2600/"}"#, 3)?,
        Some(serde_json::json!("http://localhost:2600/"))
    );
    assert_eq!(
        decode_reply(r#"{"id":3,"ok":true,"result":null}"#, 3)?,
        Some(serde_json::Value::Null)
    );
    Ok(())
}

#[test]
fn decode_surfaces_bridge_error() {
    crate::assert_err_contains!(
        decode_reply(r#"{"id":4,"ok":false,"error":"net::ERR_NAME_NOT_RESOLVED"}"#, 4),
        "ERR_NAME_NOT_RESOLVED"
    );
}

#[tokio::test]
async fn missing_bridge_program_fails_launch() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut engine = PlaywrightEngine::new("/nonexistent/awsllama-node");
    let options = LaunchOptions {
        headless: true,
        user_data_dir: dir.path().join("chrome"),
        channel: "chrome".into(),
    };
    crate::assert_err_contains!(engine.launch(&options).await, "failed to start browser bridge");
    // Nothing to tear down.
    engine.close().await?;
    Ok(())
}

#[tokio::test]
async fn requests_before_launch_fail() {
    let mut engine = PlaywrightEngine::new("node");
    crate::assert_err_contains!(engine.current_url().await, "browser not launched");
}
