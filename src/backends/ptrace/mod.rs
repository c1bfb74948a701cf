//! Event-driven waiting through process tracing.

mod sys;

use std::io;

use rustix::process::Pid;
use tracing::{debug, info, warn};

pub use self::sys::Ptrace;
use super::{Backend, Context, Visit};
use crate::{
    error::{is_errno, Error, Result},
    signame::{describe, signame},
    status::Termination,
    target::TargetState,
};

/// One state change of a tracee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Terminated(Termination),
    /// Signal-delivery stop; the signal is delivered only if re-injected.
    Signal(i32),
    /// The tracee entered a group stop.
    GroupStop(i32),
    /// ptrace event stop, such as after `execve`.
    Event,
}

/// The process-tracing primitives the backend is built on.
pub trait Tracer {
    fn attach(&mut self, pid: Pid) -> io::Result<()>;

    fn set_options(&mut self, pid: Pid) -> io::Result<()>;

    /// Restarts a stopped tracee, delivering `signal` unless it is 0.
    fn resume(&mut self, pid: Pid, signal: i32) -> io::Result<()>;

    fn detach(&mut self, pid: Pid) -> io::Result<()>;

    /// Whether `pid` has already exited but not been reaped. Attaching to
    /// such a process fails with `EPERM`.
    fn is_zombie(&mut self, pid: Pid) -> bool;

    /// Blocks for the next state change of `pid`.
    fn wait_one(&mut self, pid: Pid) -> io::Result<TraceEvent>;

    /// Blocks for the next state change of any tracee.
    fn wait_any(&mut self) -> io::Result<(Pid, TraceEvent)>;
}

enum Settled {
    /// Stopped in its attach stop and held there.
    Held,
    /// Terminated before the attach stop was seen.
    Retired,
    /// Gone without us seeing how.
    Vanished,
}

#[derive(Debug, Default)]
pub struct TraceBackend<T = Ptrace> {
    tracer: T,
}

impl<T: Tracer> TraceBackend<T> {
    pub fn new(tracer: T) -> Self {
        Self { tracer }
    }

    /// Attaches to pending targets in order. Targets are left stopped in
    /// `held`; the caller either resumes or detaches all of them.
    fn attach_all(&mut self, cx: &mut Context, held: &mut Vec<usize>) -> Result<Visit> {
        for idx in cx.registry.indices(TargetState::Pending) {
            let pid = target_pid(cx, idx);
            let raw = pid.as_raw_nonzero().get();

            match self.tracer.attach(pid) {
                Ok(()) => (),
                Err(e) if is_errno(&e, libc::EPERM) && self.tracer.is_zombie(pid) => {
                    missing(cx, idx)?;
                    continue;
                }
                Err(e) if is_errno(&e, libc::EPERM) || is_errno(&e, libc::ENOSYS) => {
                    info!(pid = raw, error = %e, "tracing unavailable");
                    return Ok(Visit::Unavailable);
                }
                Err(e) if is_errno(&e, libc::ESRCH) => {
                    missing(cx, idx)?;
                    continue;
                }
                Err(source) => return Err(Error::AttachFailed { pid: raw, source }),
            }

            match self.settle(cx, idx)? {
                Settled::Held => {
                    debug!(pid = raw, "attached");
                    cx.registry.activate(idx);
                    held.push(idx);
                }
                Settled::Retired => (),
                Settled::Vanished => missing(cx, idx)?,
            }
        }

        Ok(Visit::Ready)
    }

    /// Waits for the attach stop of a freshly attached target, passing on
    /// any signal that arrives first.
    fn settle(&mut self, cx: &mut Context, idx: usize) -> Result<Settled> {
        let pid = target_pid(cx, idx);

        loop {
            match self.tracer.wait_one(pid) {
                Ok(TraceEvent::Signal(libc::SIGSTOP) | TraceEvent::GroupStop(libc::SIGSTOP)) => {
                    return Ok(Settled::Held)
                }
                Ok(TraceEvent::Signal(signal)) => self.resume(pid, signal)?,
                Ok(TraceEvent::GroupStop(_) | TraceEvent::Event) => self.resume(pid, 0)?,
                Ok(TraceEvent::Terminated(t)) => {
                    retire(cx, idx, t);
                    return Ok(Settled::Retired);
                }
                Err(e) if is_errno(&e, libc::ESRCH) || is_errno(&e, libc::ECHILD) => {
                    return Ok(Settled::Vanished)
                }
                Err(e) => return Err(Error::WaitFailed(e)),
            }
        }
    }

    fn resume_all(&mut self, cx: &mut Context, held: &[usize]) -> Result<()> {
        for &idx in held {
            let pid = target_pid(cx, idx);

            if let Err(e) = self.tracer.set_options(pid) {
                if !is_errno(&e, libc::ESRCH) {
                    warn!(pid = pid.as_raw_nonzero().get(), error = %e, "cannot set trace options");
                }
            }
            self.resume(pid, 0)?;
            cx.reporter
                .info(pid.as_raw_nonzero().get(), format_args!("process attached"));
        }

        Ok(())
    }

    /// Detaches every held target and returns it to pending. A target that
    /// died while held is reaped and retired instead.
    fn rollback(&mut self, cx: &mut Context, held: &[usize]) -> Result<()> {
        let mut ret = Ok(());

        for &idx in held {
            let pid = target_pid(cx, idx);
            let raw = pid.as_raw_nonzero().get();

            match self.tracer.detach(pid) {
                Ok(()) => {
                    debug!(pid = raw, "detached");
                    cx.registry.release(idx);
                }
                Err(e) if is_errno(&e, libc::ESRCH) => match self.tracer.wait_one(pid) {
                    Ok(TraceEvent::Terminated(t)) => retire(cx, idx, t),
                    _ => cx.registry.release(idx),
                },
                Err(source) => {
                    warn!(pid = raw, error = %source, "cannot detach");
                    cx.registry.release(idx);
                    if ret.is_ok() {
                        ret = Err(Error::DetachFailed { pid: raw, source });
                    }
                }
            }
        }

        ret
    }

    fn resume(&mut self, pid: Pid, signal: i32) -> Result<()> {
        match self.tracer.resume(pid, signal) {
            Ok(()) => Ok(()),
            // killed while stopped; its exit is still to be reported
            Err(e) if is_errno(&e, libc::ESRCH) => Ok(()),
            Err(source) => Err(Error::ResumeFailed {
                pid: pid.as_raw_nonzero().get(),
                source,
            }),
        }
    }
}

impl<T: Tracer> Backend for TraceBackend<T> {
    fn visit(&mut self, cx: &mut Context) -> Result<Visit> {
        let mut held = Vec::new();

        match self.attach_all(cx, &mut held) {
            Ok(Visit::Ready) => {
                self.resume_all(cx, &held)?;
                Ok(Visit::Ready)
            }
            Ok(Visit::Unavailable) => {
                self.rollback(cx, &held)?;
                Ok(Visit::Unavailable)
            }
            Err(e) => {
                // the attach error wins over any rollback error
                let _ = self.rollback(cx, &held);
                Err(e)
            }
        }
    }

    fn wait(&mut self, cx: &mut Context) -> Result<()> {
        while cx.registry.active_count() > 0 {
            let (pid, event) = self.tracer.wait_any().map_err(Error::WaitFailed)?;
            let raw = pid.as_raw_nonzero().get();

            let idx = cx
                .registry
                .position(pid)
                .filter(|&i| cx.registry.get(i).map(|t| t.state()) == Some(TargetState::Active));
            let Some(idx) = idx else {
                debug!(pid = raw, ?event, "event from unknown process");
                match event {
                    TraceEvent::Terminated(_) => (),
                    TraceEvent::Signal(signal) => self.resume(pid, signal)?,
                    TraceEvent::GroupStop(_) | TraceEvent::Event => self.resume(pid, 0)?,
                }
                continue;
            };

            match event {
                TraceEvent::Terminated(t) => retire(cx, idx, t),
                TraceEvent::Signal(signal) => {
                    match describe(signal) {
                        Some(desc) => cx.reporter.info(
                            raw,
                            format_args!("received {}: {desc}", signame(signal)),
                        ),
                        None => cx
                            .reporter
                            .info(raw, format_args!("received {}", signame(signal))),
                    }
                    self.resume(pid, signal)?;
                }
                TraceEvent::GroupStop(signal) => {
                    cx.reporter
                        .info(raw, format_args!("stopped by {}", signame(signal)));
                    self.resume(pid, 0)?;
                }
                TraceEvent::Event => self.resume(pid, 0)?,
            }
        }

        Ok(())
    }
}

fn target_pid(cx: &Context, idx: usize) -> Pid {
    cx.registry.targets()[idx].pid()
}

fn retire(cx: &mut Context, idx: usize, t: Termination) {
    let raw = cx.registry.targets()[idx].raw();
    debug!(pid = raw, status = %t, "retired");
    cx.last = Some(t);
    cx.registry.finish(idx);
    cx.reporter.info(raw, format_args!("{t}"));
}

fn missing(cx: &mut Context, idx: usize) -> Result<()> {
    let raw = cx.registry.targets()[idx].raw();
    if !cx.force {
        return Err(Error::NoSuchProcess(raw));
    }
    debug!(pid = raw, "no such process, skipping");
    cx.registry.exclude(idx);
    Ok(())
}
