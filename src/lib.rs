//! Wait for arbitrary processes, not just children, to terminate.
//!
//! Targets are traced with `ptrace(2)` when allowed, which reports every exit
//! as it happens together with its status. Where tracing is forbidden the run
//! falls back to probing each PID on an interval.

pub mod backends;
pub mod config;
pub mod error;
pub mod report;
pub mod signame;
pub mod status;
pub mod target;
mod utils;

pub use rustix::process::Pid;
use tracing::info;

use crate::backends::{Backend, Context, PollBackend, Prober, Ptrace, TraceBackend, Tracer, Visit};
pub use crate::{
    backends::SystemProber,
    config::Config,
    error::{Error, Result},
    report::Reporter,
    status::{Outcome, Strategy, Termination},
    target::Registry,
    utils::process_exists,
};

/// Waits for every process named in `config`.
pub fn run(config: &Config, reporter: Reporter) -> Result<Outcome> {
    run_with(config, reporter, Ptrace, SystemProber)
}

/// [`run`] with explicit tracing and probing primitives.
pub fn run_with<T, P>(config: &Config, reporter: Reporter, tracer: T, prober: P) -> Result<Outcome>
where
    T: Tracer,
    P: Prober,
{
    config.validate()?;

    let mut registry = Registry::register(&config.pids)?;
    registry.exclude_self(rustix::process::getpid(), config.force)?;

    let mut cx = Context::new(registry, config.force, reporter);

    if !config.no_trace {
        let mut trace = TraceBackend::new(tracer);
        if trace.visit(&mut cx)? == Visit::Ready {
            trace.wait(&mut cx)?;
            return Ok(Outcome {
                strategy: Strategy::Trace,
                last: cx.last,
            });
        }
        info!("falling back to polling, exit status will not be propagated");
    }

    let mut poll = PollBackend::new(prober, config.interval);
    poll.visit(&mut cx)?;
    poll.wait(&mut cx)?;

    Ok(Outcome {
        strategy: Strategy::Poll,
        last: cx.last,
    })
}

#[cfg(not(target_os = "linux"))]
compile_error!("waitpid only supports Linux");
