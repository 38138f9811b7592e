use crate::core::types::KillReport;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
/// Process-group signalling for submitted programs
///
/// Every invocation runs as the leader of its own process group, so the
/// group id equals the leader pid and one `killpg` reaches every descendant
/// that did not call `setsid`.
use std::time::{Duration, Instant};

/// SIGTERM the group, wait `grace`, then SIGKILL it.
pub fn terminate_group(pgid: Pid, grace: Duration) -> KillReport {
    let mut report = KillReport::default();
    let start = Instant::now();

    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => report.term_sent = true,
        Err(Errno::ESRCH) => {
            report.notes.push("group already gone before SIGTERM".to_string());
        }
        Err(e) => {
            // Fall back to the leader alone.
            let _ = kill(pgid, Signal::SIGTERM);
            report.term_sent = true;
            report.notes.push(format!("group SIGTERM fallback used: {e}"));
        }
    }

    if !grace.is_zero() {
        std::thread::sleep(grace);
    }

    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => report.kill_sent = true,
        Err(Errno::ESRCH) => {
            debug!("Process group {} exited during grace period", pgid);
        }
        Err(e) => {
            let _ = kill(pgid, Signal::SIGKILL);
            report.kill_sent = true;
            report.notes.push(format!("group SIGKILL fallback used: {e}"));
        }
    }

    report.waited_ms = start.elapsed().as_millis() as u64;
    report
}

/// SIGKILL whatever is left in the group. Returns true if anything was hit.
pub fn kill_stragglers(pgid: Pid) -> bool {
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => {
            debug!("Killed lingering members of process group {}", pgid);
            true
        }
        Err(Errno::ESRCH) => false,
        Err(e) => {
            warn!("Failed to kill process group {}: {}", pgid, e);
            false
        }
    }
}

/// Whether `pid` has exited, without reaping it.
///
/// The unreaped zombie keeps the process group id reserved, so it is safe to
/// signal the group after this returns true and before the caller waits.
pub fn leader_exited(pid: Pid) -> std::io::Result<bool> {
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    let rc = unsafe {
        libc::waitid(
            libc::P_PID,
            pid.as_raw() as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        )
    };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(unsafe { info.si_pid() } != 0)
}

/// Whether any live (non-zombie) process with this pid exists.
pub fn process_alive(pid: i32) -> bool {
    let stat = match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat,
        Err(_) => return kill(Pid::from_raw(pid), None).is_ok(),
    };
    // Field 3 follows the parenthesised comm, which may itself contain spaces.
    let state = stat
        .rfind(')')
        .and_then(|idx| stat[idx + 1..].split_whitespace().next());
    !matches!(state, Some("Z") | Some("X"))
}
