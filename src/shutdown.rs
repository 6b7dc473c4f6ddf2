// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::process::ManagedProcess;
use log::{info, warn};
use nix::sys::signal::Signal;
use tokio::time::{Duration, timeout};

const SIGKILL_TIMEOUT: Duration = Duration::from_secs(10);

/// Send SIGTERM to every running process group, wait up to `stop_timeout`
/// per process, then SIGKILL stragglers.
pub async fn shutdown_all(processes: &mut [&mut ManagedProcess], stop_timeout: Duration) {
    for proc in processes.iter() {
        if proc.is_running() {
            info!("[{}] sending SIGTERM", proc.name);
            proc.send_signal_group(Signal::SIGTERM);
        }
    }

    for proc in processes.iter_mut() {
        if !proc.is_running() {
            continue;
        }
        if timeout(stop_timeout, proc.wait()).await.is_err() {
            warn!(
                "[{}] stop timeout ({}s) reached, sending SIGKILL",
                proc.name,
                stop_timeout.as_secs()
            );
            proc.send_signal_group(Signal::SIGKILL);
            if timeout(SIGKILL_TIMEOUT, proc.wait()).await.is_err() {
                warn!("[{}] still running after SIGKILL, giving up", proc.name);
            }
        }
    }
}
