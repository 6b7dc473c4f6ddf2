// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use svcboot::{EXIT_CONFIG, config, supervisor};

/// Startup orchestrator for a webserver/scheduler service pair.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file path (falls back to $SVCBOOT_CONFIG, then
    /// /etc/svcboot/svcboot.yaml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(EXIT_CONFIG);
    }
    info!("svcboot starting (version {})", env!("CARGO_PKG_VERSION"));

    let path = config::config_path(cli.config);
    let cfg = match config::load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("configuration error: {e:#}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let code = supervisor::run(cfg).await;
    info!("svcboot exiting with code {code}");
    std::process::exit(code);
}
