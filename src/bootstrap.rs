// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::{BootstrapConfig, StepConfig};
use crate::env::parse_environment_file;
use log::info;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Both variants are success: a step that was already satisfied by a prior
/// run must not block a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Performed,
    /// The step's effect already existed; `matched` is the conflict marker
    /// found in the command output.
    AlreadySatisfied { matched: String },
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("[{name}] failed to run {command}: {source}")]
    Spawn {
        name: String,
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("[{name}] exited with code {code:?}: {snippet}")]
    Failed {
        name: String,
        code: Option<i32>,
        snippet: String,
    },
}

/// Run the bootstrap sequence in order: storage initialization, then
/// administrative account creation. The first step error aborts the
/// sequence; existence conflicts do not.
pub async fn run_bootstrap(cfg: &BootstrapConfig) -> Result<(), StepError> {
    run_step("storage-init", &cfg.storage_init).await?;
    run_step("admin-account", &cfg.admin_account).await?;
    Ok(())
}

/// Run one step with captured output and classify the result.
pub async fn run_step(name: &str, step: &StepConfig) -> Result<StepOutcome, StepError> {
    let mut cmd = Command::new(&step.command);
    cmd.args(&step.args);
    if let Some(ref account) = step.account {
        cmd.args(account.to_args());
    }

    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    if let Some(ref file) = step.environment_file {
        let vars = parse_environment_file(Path::new(file)).map_err(|e| StepError::Spawn {
            name: name.to_string(),
            command: step.command.clone(),
            source: std::io::Error::other(e),
        })?;
        cmd.envs(vars);
    }
    cmd.envs(&step.env);
    cmd.stdin(Stdio::null());

    let output = cmd.output().await.map_err(|source| StepError::Spawn {
        name: name.to_string(),
        command: step.command.clone(),
        source,
    })?;

    if output.status.success() {
        info!("[{name}] performed");
        return Ok(StepOutcome::Performed);
    }

    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    if let Some(marker) = matched_conflict(&combined, &step.conflict_markers) {
        info!("[{name}] already satisfied (matched \"{marker}\")");
        return Ok(StepOutcome::AlreadySatisfied {
            matched: marker.to_string(),
        });
    }

    Err(StepError::Failed {
        name: name.to_string(),
        code: output.status.code(),
        snippet: snippet(&combined),
    })
}

fn matched_conflict<'a>(output: &str, markers: &'a [String]) -> Option<&'a str> {
    markers
        .iter()
        .map(String::as_str)
        .find(|m| !m.is_empty() && output.contains(m))
}

fn snippet(output: &str) -> String {
    const MAX: usize = 240;
    let trimmed = output.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_string();
    }
    let start = trimmed.len() - MAX;
    // Keep the tail; that is where the actual error usually is.
    let start = trimmed
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= start)
        .unwrap_or(0);
    format!("...{}", &trimmed[start..])
}
