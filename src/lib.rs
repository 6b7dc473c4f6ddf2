// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

pub mod bootstrap;
pub mod config;
pub mod env;
pub mod process;
pub mod reaper;
pub mod shutdown;
pub mod state;
pub mod supervisor;

/// Configuration could not be read or parsed.
pub const EXIT_CONFIG: i32 = 2;
/// The process table could not be scanned during reaping.
pub const EXIT_REAP_FATAL: i32 = 10;
/// A bootstrap step failed for a non-existence reason.
pub const EXIT_BOOTSTRAP_FATAL: i32 = 11;
/// Either managed process failed to launch.
pub const EXIT_LAUNCH_FATAL: i32 = 12;
