// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::ProcessConfig;
use crate::env::parse_environment_file;
use anyhow::{Context, Result};
use log::{info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// How the supervisor holds a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Spawned and left running; never directly awaited.
    Background,
    /// Spawned last; its exit governs the orchestrator's own exit.
    Foreground,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Background => write!(f, "background"),
            LaunchMode::Foreground => write!(f, "foreground"),
        }
    }
}

pub struct ManagedProcess {
    pub name: String,
    pub mode: LaunchMode,
    config: ProcessConfig,
    child: Option<Child>,
}

impl ManagedProcess {
    pub fn new(mode: LaunchMode, config: ProcessConfig) -> Self {
        Self {
            name: config.name.clone(),
            mode,
            config,
            child: None,
        }
    }

    pub fn spawn(&mut self) -> Result<()> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args);

        // Children get only the configured environment plus PATH.
        cmd.env_clear();
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        if let Some(ref file) = self.config.environment_file {
            let vars = parse_environment_file(Path::new(file))
                .with_context(|| format!("[{}] loading environment_file", self.name))?;
            cmd.envs(vars);
        }
        for (k, v) in &self.config.env {
            cmd.env(k, v);
        }

        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(stdio_from_str(&self.config.stdout));
        cmd.stderr(stdio_from_str(&self.config.stderr));

        // Each child leads its own process group so termination signals can
        // be delivered to the whole group without touching the orchestrator.
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .with_context(|| format!("[{}] failed to spawn: {}", self.name, self.config.command))?;

        let pid = child.id().unwrap_or(0);
        info!(
            "[{}] spawned (pid={}, mode={}, cmd={})",
            self.name, pid, self.mode, self.config.command
        );
        self.child = Some(child);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    pub fn send_signal(&self, sig: Signal) {
        if let Some(pid) = self.pid()
            && let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig)
        {
            warn!("[{}] failed to send {sig}: {e}", self.name);
        }
    }

    /// Deliver `sig` to the child's process group, so forked workers of the
    /// managed process receive it too and no orphan remains.
    pub fn send_signal_group(&self, sig: Signal) {
        if let Some(pid) = self.pid()
            && let Err(e) = signal::killpg(Pid::from_raw(pid as i32), sig)
        {
            warn!("[{}] failed to send {sig} to process group: {e}", self.name);
        }
    }

    /// Wait for the child to exit. Returns the exit status.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        let child = self.child.as_mut().context("no child process to wait on")?;
        let status = child.wait().await?;
        info!("[{}] exited with {status}", self.name);
        self.child = None;
        Ok(status)
    }
}

fn stdio_from_str(s: &str) -> Stdio {
    match s {
        "null" => Stdio::null(),
        _ => Stdio::inherit(),
    }
}
