//! End-to-end execution tests.
//!
//! Tests that need a real toolchain skip themselves when the binary is not
//! on PATH. The shell-backed tests always run.

#[macro_use]
mod common;

use algosync_runner::kernel::signal::process_alive;
use algosync_runner::{ExecutionCoordinator, ExecutionRequest, FailureStage, Language};
use common::{shell_coordinator, test_config, workspace_count};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_python_hello() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let coordinator = ExecutionCoordinator::new(test_config(root.path())).unwrap();

    let result = coordinator
        .execute(&ExecutionRequest::new(Language::Python, "print('ok')"))
        .unwrap();
    assert!(result.succeeded, "{:?}", result);
    assert_eq!(result.compat_view().output.trim(), "ok");
    assert_eq!(workspace_count(root.path()), 0);
}

#[test]
fn test_javascript_hello() {
    require_toolchain!("node");
    let root = tempfile::tempdir().unwrap();
    let coordinator = ExecutionCoordinator::new(test_config(root.path())).unwrap();

    let result = coordinator
        .execute(&ExecutionRequest::new(Language::JavaScript, "console.log('ok')"))
        .unwrap();
    assert!(result.succeeded, "{:?}", result);
    assert_eq!(result.stdout.trim(), "ok");
}

#[test]
fn test_cpp_hello_and_compile_error() {
    require_toolchain!("g++");
    let root = tempfile::tempdir().unwrap();
    let coordinator = ExecutionCoordinator::new(test_config(root.path())).unwrap();

    let ok = coordinator
        .execute(&ExecutionRequest::new(
            Language::Cpp,
            "#include <iostream>\nint main() { std::cout << \"ok\"; return 0; }\n",
        ))
        .unwrap();
    assert!(ok.succeeded, "{:?}", ok);
    assert_eq!(ok.stdout, "ok");

    let broken = coordinator
        .execute(&ExecutionRequest::new(Language::Cpp, "int main( {"))
        .unwrap();
    assert!(!broken.succeeded);
    assert_eq!(broken.failure_stage, FailureStage::Compile);
    assert!(broken.compat_view().output.contains("error"));
    assert_eq!(workspace_count(root.path()), 0);
}

#[test]
fn test_java_detects_public_class() {
    require_toolchain!("javac", "java");
    let root = tempfile::tempdir().unwrap();
    let coordinator = ExecutionCoordinator::new(test_config(root.path())).unwrap();

    let source = r#"
public class Solver {
    public static void main(String[] args) {
        System.out.print("ok");
    }
}
"#;
    let result = coordinator
        .execute(&ExecutionRequest::new(Language::Java, source))
        .unwrap();
    assert!(result.succeeded, "{:?}", result);
    assert_eq!(result.entry_symbol.as_deref(), Some("Solver"));
    assert_eq!(result.stdout, "ok");

    let broken = coordinator
        .execute(&ExecutionRequest::new(Language::Java, "public class Main { void x( }"))
        .unwrap();
    assert_eq!(broken.failure_stage, FailureStage::Compile);
    assert!(!broken.stderr.is_empty());
}

#[test]
fn test_python_timeout_leaves_no_orphans() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let mut config = test_config(root.path());
    config.run_timeout_ms = 1_000;
    let coordinator = ExecutionCoordinator::new(config).unwrap();

    let source = r#"
import subprocess, sys, time
child = subprocess.Popen(["sleep", "30"])
print(child.pid)
sys.stdout.flush()
time.sleep(30)
"#;
    let result = coordinator
        .execute(&ExecutionRequest::new(Language::Python, source))
        .unwrap();
    assert_eq!(result.failure_stage, FailureStage::Timeout);
    assert!(!result.compat_view().success);

    let pid: i32 = result.stdout.trim().parse().unwrap();
    thread::sleep(Duration::from_millis(200));
    assert!(!process_alive(pid), "sleep({pid}) outlived the timeout");
}

#[test]
fn test_shell_timeout_reports_runner_message() {
    let root = tempfile::tempdir().unwrap();
    let coordinator = shell_coordinator(root.path(), true);

    let result = coordinator
        .execute(&ExecutionRequest::new(Language::JavaScript, "sleep 30 & wait"))
        .unwrap();
    assert_eq!(result.failure_stage, FailureStage::Timeout);
    assert_eq!(
        result.compat_view().output,
        "Execution timed out after 3000 ms"
    );
    assert!(result.wall_time_ms < 10_000);
    assert_eq!(workspace_count(root.path()), 0);
}

#[test]
fn test_concurrent_submissions_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let coordinator = Arc::new(shell_coordinator(root.path(), true));

    // Every submission writes the same file name; a shared directory would
    // make some of them read another's marker.
    let handles: Vec<_> = (0..12)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let source = format!("echo {i} > marker; sleep 0.2; cat marker; ls | wc -l");
                let result = coordinator
                    .execute(&ExecutionRequest::new(Language::JavaScript, source))
                    .unwrap();
                (i, result)
            })
        })
        .collect();

    for handle in handles {
        let (i, result) = handle.join().unwrap();
        assert!(result.succeeded, "{:?}", result);
        let mut lines = result.stdout.lines();
        assert_eq!(lines.next(), Some(i.to_string().as_str()));
        // script.js and marker only
        assert_eq!(lines.next().map(str::trim), Some("2"));
    }
    assert_eq!(workspace_count(root.path()), 0);
}

#[test]
fn test_workspace_removed_after_every_outcome() {
    let root = tempfile::tempdir().unwrap();
    let coordinator = shell_coordinator(root.path(), true);

    for source in [
        "echo fine",
        "exit 4",
        "echo loud >&2",
        "mkdir -p a/b; ln -s / a/b/root; chmod 000 a",
    ] {
        coordinator
            .execute(&ExecutionRequest::new(Language::JavaScript, source))
            .unwrap();
        assert_eq!(workspace_count(root.path()), 0, "left behind by {source:?}");
    }
}

#[test]
fn test_strict_and_permissive_stderr() {
    let source = "echo out; echo warn >&2";

    let root = tempfile::tempdir().unwrap();
    let strict = shell_coordinator(root.path(), true)
        .execute(&ExecutionRequest::new(Language::JavaScript, source))
        .unwrap();
    assert!(!strict.succeeded);
    assert_eq!(strict.failure_stage, FailureStage::Run);
    assert_eq!(strict.compat_view().output, "warn\n");

    let permissive = shell_coordinator(root.path(), false)
        .execute(&ExecutionRequest::new(Language::JavaScript, source))
        .unwrap();
    assert!(permissive.succeeded);
    assert_eq!(permissive.compat_view().output, "out\n");
    assert_eq!(permissive.stderr, "warn\n");
}

#[test]
fn test_runtime_error_without_stderr_uses_runner_message() {
    let root = tempfile::tempdir().unwrap();
    let result = shell_coordinator(root.path(), true)
        .execute(&ExecutionRequest::new(Language::JavaScript, "exit 7"))
        .unwrap();
    assert_eq!(result.exit_code, Some(7));
    assert_eq!(
        result.compat_view().output,
        "Runtime error: sh exited with status 7"
    );
}
