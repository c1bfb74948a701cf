//! Fallback waiting by periodic existence probes.
//!
//! Works without any privilege, but cannot tell how a process ended: by the
//! time a probe misses it, its parent has already reaped it.

use std::{io, time::Duration};

use rustix::process::Pid;
use tracing::debug;

use super::{Backend, Context, Visit};
use crate::{
    error::{Error, Result},
    target::TargetState,
    utils,
};

pub trait Prober {
    fn exists(&mut self, pid: Pid) -> bool;

    fn sleep(&mut self, dur: Duration) -> io::Result<()>;
}

/// Probes with signal 0 and sleeps on the real clock.
#[derive(Debug, Default)]
pub struct SystemProber;

impl Prober for SystemProber {
    #[inline]
    fn exists(&mut self, pid: Pid) -> bool {
        utils::process_exists(pid)
    }

    #[inline]
    fn sleep(&mut self, dur: Duration) -> io::Result<()> {
        utils::sleep(dur)
    }
}

#[derive(Debug)]
pub struct PollBackend<P = SystemProber> {
    prober: P,
    interval: Duration,
}

impl<P: Prober> PollBackend<P> {
    pub fn new(prober: P, interval: Duration) -> Self {
        Self { prober, interval }
    }
}

impl<P: Prober> Backend for PollBackend<P> {
    fn visit(&mut self, cx: &mut Context) -> Result<Visit> {
        for idx in cx.registry.indices(TargetState::Pending) {
            let target = cx.registry.targets()[idx];

            if self.prober.exists(target.pid()) {
                cx.registry.activate(idx);
                cx.reporter.info(target.raw(), format_args!("process found"));
                continue;
            }

            if !cx.force {
                return Err(Error::NoSuchProcess(target.raw()));
            }
            debug!(pid = target.raw(), "no such process, skipping");
            cx.registry.exclude(idx);
        }

        Ok(Visit::Ready)
    }

    fn wait(&mut self, cx: &mut Context) -> Result<()> {
        while cx.registry.active_count() > 0 {
            self.prober
                .sleep(self.interval)
                .map_err(Error::WaitFailed)?;

            for idx in cx.registry.indices(TargetState::Active) {
                let target = cx.registry.targets()[idx];
                if self.prober.exists(target.pid()) {
                    continue;
                }

                debug!(pid = target.raw(), "gone");
                cx.registry.finish(idx);
                cx.reporter
                    .info(target.raw(), format_args!("process terminated"));
            }
        }

        Ok(())
    }
}
