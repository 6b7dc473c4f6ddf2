// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::ProcessConfig;
use log::{debug, info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::ErrorKind;
use std::path::PathBuf;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::time::Duration;

/// One managed process the reaper cleans up after: its full command-line
/// signature and the PID marker it may have left behind.
pub struct ReapTarget {
    pub name: String,
    pub signature: String,
    pub pidfile: Option<PathBuf>,
}

impl From<&ProcessConfig> for ReapTarget {
    fn from(cfg: &ProcessConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            signature: cfg.signature(),
            pidfile: cfg.pidfile.as_ref().map(PathBuf::from),
        }
    }
}

/// A process matches only on its exact full command line, so unrelated
/// processes are never signaled.
fn matches_signature(cmdline: &str, signature: &str) -> bool {
    !signature.is_empty() && cmdline == signature
}

fn cmdline(process: &sysinfo::Process) -> String {
    process
        .cmd()
        .iter()
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminate leftover instances of the managed processes and delete their
/// PID markers. Best-effort hygiene: every per-target failure is logged and
/// absorbed; "nothing found" is success. Termination is not verified, only
/// given `grace` to complete.
pub async fn reap(targets: &[ReapTarget], grace: Duration) {
    let mut sys = System::new();
    // `refresh_processes` never fetches command lines; request them explicitly
    // so the signature match below has data to compare against.
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );

    let own_pid = std::process::id();
    let mut signaled = 0usize;

    for target in targets {
        let mut found = false;
        for (pid, process) in sys.processes() {
            if pid.as_u32() == own_pid {
                continue;
            }
            if !matches_signature(&cmdline(process), &target.signature) {
                continue;
            }
            found = true;
            info!(
                "[{}] terminating leftover process (pid={})",
                target.name,
                pid.as_u32()
            );
            match signal::kill(Pid::from_raw(pid.as_u32() as i32), Signal::SIGTERM) {
                Ok(()) => signaled += 1,
                Err(e) => warn!(
                    "[{}] failed to signal leftover process (pid={}): {e}",
                    target.name,
                    pid.as_u32()
                ),
            }
        }
        if !found {
            debug!("[{}] no leftover process found", target.name);
        }
    }

    if signaled > 0 {
        info!("waiting {:.1}s for leftover processes to exit", grace.as_secs_f64());
        tokio::time::sleep(grace).await;
    }

    for target in targets {
        let Some(ref marker) = target.pidfile else {
            continue;
        };
        match std::fs::remove_file(marker) {
            Ok(()) => info!("[{}] removed stale pid marker {}", target.name, marker.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[{}] no pid marker at {}", target.name, marker.display())
            }
            Err(e) => warn!(
                "[{}] failed to remove pid marker {}: {e}",
                target.name,
                marker.display()
            ),
        }
    }
}
