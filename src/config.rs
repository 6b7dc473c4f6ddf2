// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/svcboot/svcboot.yaml";

/// Grace interval after advisory termination signals, seconds.
const DEFAULT_REAP_GRACE_SEC: f64 = 3.0;
/// Time allowed for graceful shutdown before SIGKILL, seconds.
const DEFAULT_STOP_TIMEOUT_SEC: u64 = 90;

fn default_inherit() -> String {
    "inherit".to_string()
}

fn default_reap_grace() -> f64 {
    DEFAULT_REAP_GRACE_SEC
}

fn default_stop_timeout() -> u64 {
    DEFAULT_STOP_TIMEOUT_SEC
}

/// One managed long-running process (the background scheduler or the
/// foreground webserver).
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub environment_file: Option<String>,
    pub working_dir: Option<String>,
    /// PID-marker path the process is expected to write. The orchestrator
    /// only checks for and deletes this file; it never writes it.
    pub pidfile: Option<String>,
    #[serde(default = "default_inherit")]
    pub stdout: String,
    #[serde(default = "default_inherit")]
    pub stderr: String,
    /// Full command line the reaper matches against. Defaults to
    /// `command` + `args` joined with single spaces.
    pub match_signature: Option<String>,
}

impl ProcessConfig {
    pub fn signature(&self) -> String {
        match &self.match_signature {
            Some(sig) => sig.clone(),
            None => {
                let mut parts = vec![self.command.clone()];
                parts.extend(self.args.iter().cloned());
                parts.join(" ")
            }
        }
    }
}

/// One idempotent bootstrap step: a short-lived command whose output is
/// captured and classified.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub environment_file: Option<String>,
    /// Output substrings that mean "already satisfied" on a non-zero exit.
    /// A step with no markers never absorbs a failure.
    #[serde(default)]
    pub conflict_markers: Vec<String>,
    pub account: Option<AdminAccount>,
}

/// Administrative account passed to the account-creation step as the
/// documented flag set.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub email: String,
    pub password: String,
}

impl AdminAccount {
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--username".into(),
            self.username.clone(),
            "--firstname".into(),
            self.first_name.clone(),
            "--lastname".into(),
            self.last_name.clone(),
            "--role".into(),
            self.role.clone(),
            "--email".into(),
            self.email.clone(),
            "--password".into(),
            self.password.clone(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub storage_init: StepConfig,
    pub admin_account: StepConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootConfig {
    pub background: ProcessConfig,
    pub foreground: ProcessConfig,
    pub bootstrap: BootstrapConfig,
    #[serde(default = "default_reap_grace")]
    pub reap_grace_sec: f64,
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_sec: u64,
}

/// Resolve the config path: explicit flag, then `SVCBOOT_CONFIG`, then the
/// fixed default.
pub fn config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        std::env::var("SVCBOOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    })
}

pub fn load_config(path: &Path) -> Result<BootConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: BootConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    // YAML happily yields negative or NaN floats; Duration construction
    // panics on those, so reject them here.
    if !config.reap_grace_sec.is_finite() || config.reap_grace_sec < 0.0 {
        anyhow::bail!(
            "invalid reap_grace_sec {} in {}: must be a finite, non-negative number of seconds",
            config.reap_grace_sec,
            path.display()
        );
    }
    Ok(config)
}
