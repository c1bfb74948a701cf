use std::{
    ffi::{c_int, c_void},
    io::{Error, ErrorKind, Result},
    mem::MaybeUninit,
    ptr,
};

use rustix::process::{self, Pid, WaitOptions, WaitStatus};

use super::{TraceEvent, Tracer};
use crate::{error::is_errno, status::Termination, utils};

#[cfg(target_env = "gnu")]
type Request = libc::c_uint;
#[cfg(not(target_env = "gnu"))]
type Request = libc::c_int;

/// `Tracer` backed by `ptrace(2)` and `waitpid(2)`.
#[derive(Debug, Default)]
pub struct Ptrace;

fn ptrace(request: Request, pid: Pid, data: *mut c_void) -> Result<()> {
    // SAFETY: none of the requests used here read through `addr`, and `data`
    // is either a plain integer or points to a live, correctly sized buffer
    let ret = unsafe {
        libc::ptrace(
            request,
            pid.as_raw_nonzero().get(),
            ptr::null_mut::<c_void>(),
            data,
        )
    };

    if ret == -1 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

fn wait_options() -> WaitOptions {
    // __WALL: also report tracees that are not our children
    WaitOptions::from_bits_retain(libc::__WALL as u32)
}

impl Ptrace {
    /// A stop-signal stop whose siginfo cannot be fetched is a group stop.
    fn is_group_stop(pid: Pid, signal: c_int) -> bool {
        if !matches!(
            signal,
            libc::SIGSTOP | libc::SIGTSTP | libc::SIGTTIN | libc::SIGTTOU
        ) {
            return false;
        }

        let mut info = MaybeUninit::<libc::siginfo_t>::uninit();
        match ptrace(libc::PTRACE_GETSIGINFO, pid, info.as_mut_ptr().cast()) {
            Err(e) => is_errno(&e, libc::EINVAL),
            Ok(()) => false,
        }
    }

    fn classify(pid: Pid, status: WaitStatus) -> Option<TraceEvent> {
        match decode(status.as_raw() as c_int)? {
            Decoded::Terminated(t) => Some(TraceEvent::Terminated(t)),
            Decoded::Stopped { event: true, .. } => Some(TraceEvent::Event),
            Decoded::Stopped { signal, .. } if Self::is_group_stop(pid, signal) => {
                Some(TraceEvent::GroupStop(signal))
            }
            Decoded::Stopped { signal, .. } => Some(TraceEvent::Signal(signal)),
        }
    }
}

impl Tracer for Ptrace {
    fn attach(&mut self, pid: Pid) -> Result<()> {
        ptrace(libc::PTRACE_ATTACH, pid, ptr::null_mut())
    }

    fn set_options(&mut self, pid: Pid) -> Result<()> {
        let options = libc::PTRACE_O_TRACEEXEC as usize;
        ptrace(libc::PTRACE_SETOPTIONS, pid, options as *mut c_void)
    }

    fn resume(&mut self, pid: Pid, signal: c_int) -> Result<()> {
        ptrace(libc::PTRACE_CONT, pid, signal as usize as *mut c_void)
    }

    fn detach(&mut self, pid: Pid) -> Result<()> {
        ptrace(libc::PTRACE_DETACH, pid, ptr::null_mut())
    }

    fn is_zombie(&mut self, pid: Pid) -> bool {
        utils::is_zombie(pid)
    }

    fn wait_one(&mut self, pid: Pid) -> Result<TraceEvent> {
        loop {
            match process::waitpid(Some(pid), wait_options()) {
                Ok(Some(status)) => {
                    if let Some(event) = Self::classify(pid, status) {
                        return Ok(event);
                    }
                }
                Ok(None) => continue,
                Err(e) if e == rustix::io::Errno::INTR => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn wait_any(&mut self) -> Result<(Pid, TraceEvent)> {
        loop {
            match process::wait(wait_options()) {
                Ok(Some((pid, status))) => {
                    if let Some(event) = Self::classify(pid, status) {
                        return Ok((pid, event));
                    }
                }
                Ok(None) => return Err(ErrorKind::WouldBlock.into()),
                Err(e) if e == rustix::io::Errno::INTR => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoded {
    Terminated(Termination),
    /// `event` is set for ptrace event stops (e.g. exec), whose stop signal
    /// is a synthetic SIGTRAP that must not be delivered.
    Stopped { signal: c_int, event: bool },
}

fn decode(raw: c_int) -> Option<Decoded> {
    if libc::WIFEXITED(raw) {
        return Some(Decoded::Terminated(Termination::Exited(
            libc::WEXITSTATUS(raw) as u8,
        )));
    }

    if libc::WIFSIGNALED(raw) {
        return Some(Decoded::Terminated(Termination::Killed {
            signal: libc::WTERMSIG(raw),
            core_dumped: libc::WCOREDUMP(raw),
        }));
    }

    if libc::WIFSTOPPED(raw) {
        return Some(Decoded::Stopped {
            signal: libc::WSTOPSIG(raw),
            event: raw >> 16 != 0,
        });
    }

    // continued
    None
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const fn exited(code: c_int) -> c_int {
        code << 8
    }

    const fn stopped(signal: c_int) -> c_int {
        (signal << 8) | 0x7f
    }

    #[rstest]
    #[case(exited(0), Decoded::Terminated(Termination::Exited(0)))]
    #[case(exited(7), Decoded::Terminated(Termination::Exited(7)))]
    #[case(exited(255), Decoded::Terminated(Termination::Exited(255)))]
    #[case(
        libc::SIGKILL,
        Decoded::Terminated(Termination::Killed { signal: libc::SIGKILL, core_dumped: false })
    )]
    #[case(
        libc::SIGSEGV | 0x80,
        Decoded::Terminated(Termination::Killed { signal: libc::SIGSEGV, core_dumped: true })
    )]
    #[case(stopped(libc::SIGUSR1), Decoded::Stopped { signal: libc::SIGUSR1, event: false })]
    #[case(stopped(libc::SIGSTOP), Decoded::Stopped { signal: libc::SIGSTOP, event: false })]
    #[case(
        stopped(libc::SIGTRAP | (libc::PTRACE_EVENT_EXEC << 8)),
        Decoded::Stopped { signal: libc::SIGTRAP, event: true }
    )]
    fn decodes_wait_status(#[case] raw: c_int, #[case] expected: Decoded) {
        assert_eq!(decode(raw), Some(expected));
    }

    #[test]
    fn continued_is_skipped() {
        assert_eq!(decode(0xffff), None);
    }
}
