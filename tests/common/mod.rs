#![allow(dead_code)]

use algosync_runner::config::runner::RunnerConfig;
use algosync_runner::ExecutionCoordinator;
use std::path::Path;
use std::process::{Command, Stdio};

/// Whether `program` can be launched at all.
pub fn toolchain_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Skip the calling test when a toolchain binary is missing.
#[macro_export]
macro_rules! require_toolchain {
    ($($program:expr),+) => {
        $(
            if !common::toolchain_available($program) {
                eprintln!("skipping: {} not found on PATH", $program);
                return;
            }
        )+
    };
}

pub fn test_config(root: &Path) -> RunnerConfig {
    RunnerConfig {
        workspace_root: root.to_path_buf(),
        run_timeout_ms: 3_000,
        compile_timeout_ms: 60_000,
        kill_grace_ms: 50,
        ..RunnerConfig::default()
    }
}

/// Coordinator whose JavaScript adapter launches `/bin/sh`, so submissions
/// are shell scripts and the tests need no real toolchain.
pub fn shell_coordinator(root: &Path, strict_stderr: bool) -> ExecutionCoordinator {
    let mut config = test_config(root);
    config.toolchains.node = "/bin/sh".to_string();
    config.strict_stderr = strict_stderr;
    ExecutionCoordinator::new(config).unwrap()
}

pub fn workspace_count(root: &Path) -> usize {
    std::fs::read_dir(root).map(|entries| entries.count()).unwrap_or(0)
}
