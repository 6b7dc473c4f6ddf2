// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::{debug, error};
use std::fmt;

/// Phases of a single startup run. Each state is visited at most once;
/// there is no retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    /// Terminating leftover processes and deleting stale PID markers.
    Reaping,
    /// Running the idempotent initialization steps.
    Bootstrapping,
    /// Spawning the detached background process.
    LaunchingBackground,
    /// Spawning the foreground process.
    LaunchingForeground,
    /// Both processes launched; blocked on the foreground exit.
    Running,
    Terminated,
}

impl RunState {
    pub(crate) fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        // Terminated is reachable from anywhere on a fatal error.
        if next == Terminated {
            return self != Terminated;
        }
        matches!(
            (self, next),
            (Init, Reaping)
                | (Reaping, Bootstrapping)
                | (Bootstrapping, LaunchingBackground)
                | (LaunchingBackground, LaunchingForeground)
                | (LaunchingForeground, Running)
        )
    }

    /// Advance to `next`, logging the transition. Invalid transitions are a
    /// programming error; they are logged and the target state is entered
    /// anyway so a run never wedges.
    pub fn advance(self, next: RunState) -> RunState {
        if self.can_transition_to(next) {
            debug!("state: {self} -> {next}");
        } else {
            error!("invalid state transition: {self} -> {next}");
        }
        next
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Init => write!(f, "init"),
            RunState::Reaping => write!(f, "reaping"),
            RunState::Bootstrapping => write!(f, "bootstrapping"),
            RunState::LaunchingBackground => write!(f, "launching-background"),
            RunState::LaunchingForeground => write!(f, "launching-foreground"),
            RunState::Running => write!(f, "running"),
            RunState::Terminated => write!(f, "terminated"),
        }
    }
}
