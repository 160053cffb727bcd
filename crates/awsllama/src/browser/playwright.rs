// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`BrowserEngine`] backed by a Node Playwright bridge process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::browser::{BrowserEngine, LaunchOptions, WaitUntil};
use crate::BoxFuture;

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Slack on top of the in-browser timeout before the bridge is considered hung.
const REPLY_GRACE: Duration = Duration::from_secs(10);
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum BridgeCommand<'a> {
    Launch { headless: bool, user_data_dir: &'a Path, channel: &'a str },
    Navigate { url: &'a str, wait_until: WaitUntil, timeout_ms: u64 },
    CurrentUrl,
    WaitForUrl { url: &'a str, timeout_ms: u64 },
    WaitForSelector { selector: &'a str, timeout_ms: u64 },
    Fill { selector: &'a str, value: &'a str },
    Click { selector: &'a str },
    Close,
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: BridgeCommand<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn encode_request(id: u64, command: BridgeCommand<'_>) -> anyhow::Result<String> {
    let mut line = serde_json::to_string(&BridgeRequest { id, command })?;
    line.push('\n');
    Ok(line)
}

/// `Ok(None)` for lines that are not the reply to `id` (stray output).
pub(crate) fn decode_reply(line: &str, id: u64) -> anyhow::Result<Option<serde_json::Value>> {
    let Ok(reply) = serde_json::from_str::<BridgeReply>(line) else {
        return Ok(None);
    };
    if reply.id != id {
        return Ok(None);
    }
    if !reply.ok {
        anyhow::bail!("{}", reply.error.unwrap_or_else(|| "unknown bridge error".to_owned()));
    }
    Ok(Some(reply.result))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

pub struct PlaywrightEngine {
    program: String,
    process: Option<BridgeProcess>,
    next_id: u64,
}

impl PlaywrightEngine {
    /// `program` runs the bridge as `<program> -e <script>` (normally `node`).
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), process: None, next_id: 0 }
    }

    fn spawn(&self) -> anyhow::Result<BridgeProcess> {
        let mut child = Command::new(self.program.trim())
            .arg("-e")
            .arg(BRIDGE_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                anyhow::anyhow!("failed to start browser bridge '{}': {e}", self.program)
            })?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("bridge stdin unavailable"))?;
        let stdout =
            child.stdout.take().ok_or_else(|| anyhow::anyhow!("bridge stdout unavailable"))?;
        Ok(BridgeProcess { child, stdin, stdout: BufReader::new(stdout).lines() })
    }

    async fn request(
        &mut self,
        command: BridgeCommand<'_>,
        reply_timeout: Duration,
    ) -> anyhow::Result<serde_json::Value> {
        self.next_id += 1;
        let id = self.next_id;
        let line = encode_request(id, command)?;
        let process = self.process.as_mut().ok_or_else(|| anyhow::anyhow!("browser not launched"))?;

        process.stdin.write_all(line.as_bytes()).await?;
        process.stdin.flush().await?;

        let read = async {
            while let Some(line) = process.stdout.next_line().await? {
                if let Some(result) = decode_reply(&line, id)? {
                    return Ok(result);
                }
            }
            Err::<serde_json::Value, _>(anyhow::anyhow!("browser bridge exited"))
        };
        tokio::time::timeout(reply_timeout, read)
            .await
            .map_err(|_| anyhow::anyhow!("browser bridge did not reply within {reply_timeout:?}"))?
    }

    async fn request_bool(
        &mut self,
        command: BridgeCommand<'_>,
        timeout: Duration,
    ) -> anyhow::Result<bool> {
        let value = self.request(command, timeout + REPLY_GRACE).await?;
        value.as_bool().ok_or_else(|| anyhow::anyhow!("expected boolean from bridge, got {value}"))
    }
}

impl BrowserEngine for PlaywrightEngine {
    fn launch<'a>(&'a mut self, options: &'a LaunchOptions) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            if self.process.is_some() {
                anyhow::bail!("browser already launched");
            }
            std::fs::create_dir_all(&options.user_data_dir)?;
            self.process = Some(self.spawn()?);
            let command = BridgeCommand::Launch {
                headless: options.headless,
                user_data_dir: &options.user_data_dir,
                channel: &options.channel,
            };
            self.request(command, LAUNCH_TIMEOUT).await?;
            tracing::debug!(headless = options.headless, "browser launched");
            Ok(())
        })
    }

    fn navigate<'a>(
        &'a mut self,
        url: &'a str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let command = BridgeCommand::Navigate { url, wait_until, timeout_ms: millis(timeout) };
            self.request(command, timeout + REPLY_GRACE).await?;
            Ok(())
        })
    }

    fn current_url(&mut self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async move {
            let value = self.request(BridgeCommand::CurrentUrl, DEFAULT_REPLY_TIMEOUT).await?;
            value
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| anyhow::anyhow!("expected URL from bridge, got {value}"))
        })
    }

    fn wait_for_url<'a>(
        &'a mut self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            let command = BridgeCommand::WaitForUrl { url, timeout_ms: millis(timeout) };
            self.request_bool(command, timeout).await
        })
    }

    fn wait_for_selector<'a>(
        &'a mut self,
        selector: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            let command = BridgeCommand::WaitForSelector { selector, timeout_ms: millis(timeout) };
            self.request_bool(command, timeout).await
        })
    }

    fn fill<'a>(
        &'a mut self,
        selector: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.request(BridgeCommand::Fill { selector, value }, DEFAULT_REPLY_TIMEOUT).await?;
            Ok(())
        })
    }

    fn click<'a>(&'a mut self, selector: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.request(BridgeCommand::Click { selector }, DEFAULT_REPLY_TIMEOUT).await?;
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            if self.process.is_none() {
                return Ok(());
            }
            if let Err(e) = self.request(BridgeCommand::Close, DEFAULT_REPLY_TIMEOUT).await {
                tracing::debug!(err = %e, "bridge close request failed");
            }
            let Some(mut process) = self.process.take() else {
                return Ok(());
            };
            // EOF on stdin makes the bridge exit on its own.
            drop(process.stdin);
            match tokio::time::timeout(EXIT_TIMEOUT, process.child.wait()).await {
                Ok(status) => {
                    status?;
                }
                Err(_) => {
                    tracing::warn!("browser bridge did not exit, killing it");
                    process.child.kill().await?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "playwright_tests.rs"]
mod tests;
