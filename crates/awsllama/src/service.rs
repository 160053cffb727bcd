// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! launchd integration for `install` and `start` (macOS).

use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use tokio::process::Command;
use tracing::{info, warn};

pub const LAUNCHD_LABEL: &str = "com.rapid7.awsllama";

/// Inputs to the plist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub label: String,
    /// Working directory and home of the stdout/stderr logs.
    pub state_dir: PathBuf,
    pub executable: PathBuf,
}

pub fn render_plist(spec: &ServiceSpec) -> String {
    let state_dir = spec.state_dir.to_string_lossy();
    let state_dir = escape(state_dir.as_ref());
    let executable = spec.executable.to_string_lossy();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
  <dict>
    <key>Label</key>
    <string>{label}</string>

    <key>StandardErrorPath</key>
    <string>{state_dir}/stderr.log</string>

    <key>StandardOutPath</key>
    <string>{state_dir}/stdout.log</string>

    <key>WorkingDirectory</key>
    <string>{state_dir}</string>

    <key>ProgramArguments</key>
    <array>
      <string>{executable}</string>
      <string>serve</string>
    </array>
  </dict>
</plist>
"#,
        label = escape(spec.label.as_str()),
        executable = escape(executable.as_ref()),
    )
}

/// `~/Library/LaunchAgents/<label>.plist`
pub fn plist_path(home: &Path, label: &str) -> PathBuf {
    home.join("Library").join("LaunchAgents").join(format!("{label}.plist"))
}

/// Write the plist and (re)load it into launchd.
pub async fn install(executable: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if !cfg!(target_os = "macos") {
        anyhow::bail!("installation is only supported on macOS");
    }
    let executable = match executable {
        Some(path) => path,
        None => std::env::current_exe()?,
    };
    let home = PathBuf::from(std::env::var("HOME").unwrap_or_default());
    let spec = ServiceSpec {
        label: LAUNCHD_LABEL.to_owned(),
        state_dir: crate::config::state_dir(),
        executable,
    };

    let path = write_plist(&home, &spec)?;

    match launchctl(&["unload", &path.to_string_lossy()]).await {
        Ok(()) => {}
        Err(e) => warn!(err = %e, "launchctl unload failed (expected on first install)"),
    }
    launchctl(&["load", "-w", &path.to_string_lossy()]).await?;
    info!(path = %path.display(), "service installed");
    Ok(path)
}

/// Create the directories and write the plist, returning its path.
pub fn write_plist(home: &Path, spec: &ServiceSpec) -> anyhow::Result<PathBuf> {
    let path = plist_path(home, &spec.label);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&spec.state_dir)?;
    std::fs::write(&path, render_plist(spec))?;
    Ok(path)
}

pub async fn start() -> anyhow::Result<()> {
    launchctl(&["start", LAUNCHD_LABEL]).await
}

async fn launchctl(args: &[&str]) -> anyhow::Result<()> {
    let output = Command::new("launchctl").args(args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        anyhow::bail!("launchctl {} failed: {stderr}", args.join(" "));
    }
    Ok(())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
