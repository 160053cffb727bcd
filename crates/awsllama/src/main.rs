// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use awsllama::config::{Cli, Command, Config, Settings};
use awsllama::scheduler::RefreshOutcome;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&cli.config);
    let _ = rustls::crypto::ring::default_provider().install_default();

    let result = match cli.command() {
        Command::Serve => awsllama::run_serve(load_settings(&cli.config)).await,
        Command::Refresh => match awsllama::run_refresh(load_settings(&cli.config)).await {
            Ok(RefreshOutcome::Idle) => {
                println!("All credentials are fresh.");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        },
        Command::Status => {
            let url = format!("http://{}:{}", cli.config.host, cli.config.port);
            std::process::exit(awsllama::status::run(&url).await);
        }
        Command::Install { executable } => awsllama::service::install(executable).await.map(|path| {
            println!("Installed service to {}. Run 'awsllama start' to start it.", path.display());
        }),
        Command::Start => awsllama::service::start().await,
    };

    if let Err(e) = result {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn load_settings(config: &Config) -> Settings {
    match Settings::load(config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).init();
        }
    }
}
