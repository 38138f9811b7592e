/// Subprocess launching with wall-clock limits
///
/// Each invocation runs directly from its argument vector (no shell) as the
/// leader of a fresh process group. On timeout the whole group is terminated;
/// on a normal exit anything the program left running in its group is
/// killed before the leader is reaped.
use crate::config::runner::RunnerConfig;
use crate::config::types::{Result, RunnerError};
use crate::core::types::{Invocation, ProcessOutput};
use crate::kernel::signal;
use crate::utils::output::{OutputCollector, OutputLimits};
use nix::unistd::Pid;
use std::io::{ErrorKind, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Variables passed through from the service environment. Everything else
/// is dropped.
const INHERITED_ENV: &[&str] = &["PATH", "LANG", "LC_ALL", "JAVA_HOME"];

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    limits: OutputLimits,
    kill_grace: Duration,
}

impl ProcessRunner {
    pub fn new(limits: OutputLimits, kill_grace: Duration) -> Self {
        Self { limits, kill_grace }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(
            OutputLimits {
                stdout_limit: config.stdout_limit,
                stderr_limit: config.stderr_limit,
                ..OutputLimits::default()
            },
            config.kill_grace(),
        )
    }

    fn command(&self, invocation: &Invocation, working_dir: &Path, piped_stdin: bool) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(working_dir)
            .env_clear()
            .env("HOME", working_dir)
            .env("TMPDIR", working_dir)
            .stdin(if piped_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        for key in INHERITED_ENV {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        cmd
    }

    /// Run one invocation to completion or until `timeout` elapses.
    ///
    /// A non-zero exit or a timeout is reported in the returned
    /// [`ProcessOutput`]; only failures to launch or supervise the process
    /// are errors.
    pub fn run(
        &self,
        invocation: &Invocation,
        working_dir: &Path,
        timeout: Duration,
        stdin: Option<&[u8]>,
    ) -> Result<ProcessOutput> {
        let started = Instant::now();
        let mut child = self
            .command(invocation, working_dir, stdin.is_some())
            .spawn()
            .map_err(|e| {
                RunnerError::Internal(format!(
                    "Failed to launch {}: {}",
                    invocation.program_name(),
                    e
                ))
            })?;

        let pid = Pid::from_raw(child.id() as i32);
        log::debug!("Spawned {} as pid {}", invocation, pid);

        let feeder = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => {
                let data = data.to_vec();
                let (done, fed) = channel();
                let handle = thread::spawn(move || {
                    if let Err(e) = pipe.write_all(&data) {
                        // The program may legitimately exit without reading.
                        if e.kind() != ErrorKind::BrokenPipe {
                            log::debug!("stdin write failed: {}", e);
                        }
                    }
                    let _ = done.send(());
                });
                Some((handle, fed))
            }
            _ => None,
        };

        let pending = OutputCollector::new(self.limits.clone())
            .start(child.stdout.take(), child.stderr.take());

        let mut timed_out = false;
        let mut kill_report = None;
        loop {
            match signal::leader_exited(pid) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    signal::terminate_group(pid, Duration::ZERO);
                    let _ = child.wait();
                    return Err(RunnerError::Internal(format!(
                        "Failed to poll pid {}: {}",
                        pid, e
                    )));
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                log::info!(
                    "{} exceeded {} ms, terminating process group {}",
                    invocation.program_name(),
                    timeout.as_millis(),
                    pid
                );
                timed_out = true;
                kill_report = Some(signal::terminate_group(pid, self.kill_grace));
                break;
            }
            thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }

        if !timed_out && signal::kill_stragglers(pid) {
            log::debug!("Killed processes left behind by {}", invocation.program_name());
        }

        let status = child.wait().map_err(|e| {
            RunnerError::Internal(format!("Failed to reap pid {}: {}", pid, e))
        })?;
        let wall_time = started.elapsed();

        let window = Duration::from_millis(self.limits.collection_timeout_ms);
        let deadline = Instant::now() + window;
        let collected = pending.finish();
        if let Some((handle, fed)) = feeder {
            // A reader outside the group can keep the pipe full forever.
            match fed.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    let _ = handle.join();
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("stdin of {} still blocked; abandoning the writer", pid);
                }
            }
        }

        Ok(ProcessOutput {
            stdout: collected.stdout,
            stderr: collected.stderr,
            exit_code: status.code(),
            signal: status.signal(),
            timed_out,
            wall_time,
            integrity: collected.integrity,
            kill_report,
        })
    }
}
