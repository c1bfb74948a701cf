use std::{fs, time::Duration};

use rustix::{
    io::Errno,
    process::{test_kill_process, Pid},
    thread::{nanosleep, NanosleepRelativeResult, Timespec},
};

/// Existence probe: signal 0 checks the PID without delivering anything.
///
/// Only `ESRCH` means gone; `EPERM` still proves the process is there. A
/// zombie answers signal 0 but has already terminated, so it counts as gone.
#[must_use]
pub fn process_exists(pid: Pid) -> bool {
    !matches!(test_kill_process(pid), Err(Errno::SRCH)) && !is_zombie(pid)
}

/// Whether `pid` has exited and is waiting to be reaped by its parent.
#[must_use]
pub fn is_zombie(pid: Pid) -> bool {
    let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", pid.as_raw_nonzero())) else {
        return false;
    };

    // `pid (comm) state ...`; comm may itself contain parentheses
    stat.rfind(')')
        .and_then(|i| stat[i + 1..].split_whitespace().next())
        .is_some_and(|state| state == "Z")
}

/// Sleeps for `dur`, resuming with the remaining time whenever a signal
/// interrupts the sleep.
pub fn sleep(dur: Duration) -> std::io::Result<()> {
    let mut req = Timespec {
        tv_sec: dur.as_secs().try_into().unwrap_or(i64::MAX) as _,
        tv_nsec: dur.subsec_nanos() as _,
    };

    loop {
        match nanosleep(&req) {
            NanosleepRelativeResult::Ok => return Ok(()),
            NanosleepRelativeResult::Interrupted(remaining) => req = remaining,
            NanosleepRelativeResult::Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use rustix::process::getpid;

    use super::*;

    #[test]
    fn own_process_exists() {
        assert!(process_exists(getpid()));
    }

    #[test]
    fn reaped_child_does_not_exist() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32).unwrap();
        child.wait().unwrap();
        assert!(!process_exists(pid));
    }

    #[test]
    fn unreaped_child_is_a_zombie_and_gone() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !is_zombie(pid) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(is_zombie(pid));
        assert!(!process_exists(pid));
        child.wait().unwrap();
    }

    #[test]
    fn live_process_is_not_a_zombie() {
        assert!(!is_zombie(getpid()));
    }

    #[test]
    fn sleep_waits_at_least_the_interval() {
        let start = Instant::now();
        sleep(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
