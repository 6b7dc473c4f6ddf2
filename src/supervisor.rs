// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::bootstrap::{self, StepError};
use crate::config::BootConfig;
use crate::process::{LaunchMode, ManagedProcess};
use crate::reaper::{self, ReapTarget};
use crate::shutdown::shutdown_all;
use crate::state::RunState;
use crate::{EXIT_BOOTSTRAP_FATAL, EXIT_LAUNCH_FATAL};
use log::{error, info, warn};
use thiserror::Error;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::Duration;

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] StepError),
    #[error("launch failed: {0:#}")]
    Launch(#[source] anyhow::Error),
}

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::Bootstrap(_) => EXIT_BOOTSTRAP_FATAL,
            FatalError::Launch(_) => EXIT_LAUNCH_FATAL,
        }
    }
}

/// Run the full startup sequence and supervise the pair until the foreground
/// process exits or a termination signal arrives. Returns the process exit
/// code for `main`.
pub async fn run(cfg: BootConfig) -> i32 {
    match run_sequence(cfg).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    }
}

async fn run_sequence(cfg: BootConfig) -> Result<i32, FatalError> {
    let mut state = RunState::Init;
    let result = drive(&mut state, cfg).await;
    state.advance(RunState::Terminated);
    result
}

/// SIGTERM/SIGINT streams, installed before the sequence starts so a signal
/// arriving during reaping or bootstrapping is held until the supervisor
/// can shut the pair down, instead of killing the orchestrator mid-phase.
struct TermSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

impl TermSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for either signal; returns its number.
    async fn recv(&mut self) -> i32 {
        tokio::select! {
            _ = self.sigterm.recv() => {
                info!("received SIGTERM");
                SignalKind::terminate().as_raw_value()
            }
            _ = self.sigint.recv() => {
                info!("received SIGINT");
                SignalKind::interrupt().as_raw_value()
            }
        }
    }
}

async fn drive(state: &mut RunState, cfg: BootConfig) -> Result<i32, FatalError> {
    let mut signals = TermSignals::install().map_err(|e| {
        FatalError::Launch(anyhow::Error::new(e).context("installing signal handlers"))
    })?;

    *state = state.advance(RunState::Reaping);
    let targets = [
        ReapTarget::from(&cfg.background),
        ReapTarget::from(&cfg.foreground),
    ];
    reaper::reap(&targets, Duration::from_secs_f64(cfg.reap_grace_sec)).await;

    *state = state.advance(RunState::Bootstrapping);
    bootstrap::run_bootstrap(&cfg.bootstrap).await?;

    let stop_timeout = Duration::from_secs(cfg.stop_timeout_sec);
    let mut background = ManagedProcess::new(LaunchMode::Background, cfg.background);
    let mut foreground = ManagedProcess::new(LaunchMode::Foreground, cfg.foreground);

    // Launch order is a hard dependency: the serving process must not come
    // up without its background companion.
    *state = state.advance(RunState::LaunchingBackground);
    background.spawn().map_err(FatalError::Launch)?;

    *state = state.advance(RunState::LaunchingForeground);
    if let Err(e) = foreground.spawn() {
        shutdown_all(&mut [&mut background], stop_timeout).await;
        return Err(FatalError::Launch(e));
    }

    *state = state.advance(RunState::Running);
    Ok(supervise(&mut background, &mut foreground, &mut signals, stop_timeout).await)
}

/// Block on the foreground exit or a termination signal. In both cases every
/// still-running managed process is stopped before returning.
async fn supervise(
    background: &mut ManagedProcess,
    foreground: &mut ManagedProcess,
    signals: &mut TermSignals,
    stop_timeout: Duration,
) -> i32 {
    enum Wake {
        ForegroundExit(anyhow::Result<std::process::ExitStatus>),
        Signal(i32),
    }

    let wake = tokio::select! {
        status = foreground.wait() => Wake::ForegroundExit(status),
        signum = signals.recv() => Wake::Signal(signum),
    };

    match wake {
        Wake::ForegroundExit(status) => {
            let code = match status {
                Ok(st) => exit_code_from_status(st),
                Err(e) => {
                    warn!("[{}] wait failed: {e:#}", foreground.name);
                    1
                }
            };
            info!("[{}] foreground exited, stopping background", foreground.name);
            shutdown_all(&mut [background], stop_timeout).await;
            code
        }
        Wake::Signal(signum) => {
            shutdown_all(&mut [foreground, background], stop_timeout).await;
            128 + signum
        }
    }
}

fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(code) = status.code() {
        code
    } else if let Some(sig) = status.signal() {
        128 + sig
    } else {
        1
    }
}
