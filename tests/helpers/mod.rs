// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type LogSink = Arc<Mutex<Vec<String>>>;

/// Handle to a running svcboot orchestrator process. Both output streams are
/// merged into one ordered log so tests can assert on sequencing across them.
pub struct OrchestratorHandle {
    child: Child,
    log_lines: LogSink,
    _readers: Vec<std::thread::JoinHandle<()>>,
}

/// Drain a child output stream into `sink`, echoing each line for the
/// test runner's own output.
fn capture(
    stream: impl Read + Send + 'static,
    tag: &'static str,
    sink: LogSink,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            eprintln!("[{tag}] {line}");
            sink.lock().unwrap().push(line);
        }
    })
}

/// Poll `ready` every 50ms until it returns true or `timeout` elapses.
fn poll_until(timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if ready() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

impl OrchestratorHandle {
    /// Start the orchestrator with `SVCBOOT_CONFIG` pointing to `config_path`.
    pub fn start(config_path: &Path) -> Self {
        let bin = env!("CARGO_BIN_EXE_svcboot");
        let mut child = Command::new(bin)
            .env("SVCBOOT_CONFIG", config_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start svcboot");

        let stdout = child.stdout.take().expect("failed to capture stdout");
        let stderr = child.stderr.take().expect("failed to capture stderr");
        let log_lines: LogSink = Arc::new(Mutex::new(Vec::new()));

        // simple_logger writes INFO to stdout, WARN/ERROR to stderr.
        let readers = vec![
            capture(stdout, "svcboot", Arc::clone(&log_lines)),
            capture(stderr, "svcboot:err", Arc::clone(&log_lines)),
        ];

        Self {
            child,
            log_lines,
            _readers: readers,
        }
    }

    /// Wait until a log line containing `pattern` appears, or timeout.
    pub fn wait_for_log(&self, pattern: &str, timeout: Duration) -> bool {
        poll_until(timeout, || self.count_log_matches(pattern) > 0)
    }

    pub fn wait_for_log_default(&self, pattern: &str) -> bool {
        self.wait_for_log(pattern, DEFAULT_TIMEOUT)
    }

    pub fn count_log_matches(&self, pattern: &str) -> usize {
        let lines = self.log_lines.lock().unwrap();
        lines.iter().filter(|l| l.contains(pattern)).count()
    }

    /// Index of the first log line containing `pattern`, for ordering checks.
    pub fn log_index(&self, pattern: &str) -> Option<usize> {
        let lines = self.log_lines.lock().unwrap();
        lines.iter().position(|l| l.contains(pattern))
    }

    pub fn send_signal(&self, sig: Signal) {
        let pid = self.child.id() as i32;
        signal::kill(Pid::from_raw(pid), sig).expect("failed to signal svcboot");
    }

    /// Send SIGTERM and wait for the orchestrator to exit.
    pub fn stop(&mut self) -> std::process::ExitStatus {
        self.send_signal(Signal::SIGTERM);
        self.wait_with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn wait_with_timeout(&mut self, timeout: Duration) -> std::process::ExitStatus {
        let child = &mut self.child;
        let mut status = None;
        poll_until(timeout, || {
            status = child.try_wait().expect("failed to check svcboot status");
            status.is_some()
        });
        match status {
            Some(status) => status,
            None => {
                child.kill().ok();
                child.wait().expect("failed to wait on killed svcboot")
            }
        }
    }

    /// Extract PIDs from "spawned (pid=NNN" log lines, in spawn order.
    pub fn spawned_pids(&self) -> Vec<u32> {
        let lines = self.log_lines.lock().unwrap();
        lines
            .iter()
            .filter_map(|l| {
                let marker = "spawned (pid=";
                let start = l.find(marker)? + marker.len();
                let end = l[start..].find(|c: char| !c.is_ascii_digit())? + start;
                l[start..end].parse().ok()
            })
            .collect()
    }
}

impl Drop for OrchestratorHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Write a svcboot YAML config into `dir` and return its path.
pub fn write_config(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("svcboot.yaml");
    std::fs::write(&path, yaml)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

pub fn pid_is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

pub fn wait_for_pid_gone(pid: u32, timeout: Duration) -> bool {
    poll_until(timeout, || !pid_is_alive(pid))
}
