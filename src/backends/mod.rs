pub mod poll;
pub mod ptrace;

use crate::{error::Result, report::Reporter, status::Termination, target::Registry};

pub use poll::{PollBackend, Prober, SystemProber};
pub use ptrace::{Ptrace, TraceBackend, TraceEvent, Tracer};

/// State of one run, threaded through whichever backend drives it.
#[derive(Debug)]
pub struct Context {
    pub force: bool,
    pub registry: Registry,
    /// Status of the most recently retired target.
    pub last: Option<Termination>,
    pub reporter: Reporter,
}

impl Context {
    pub fn new(registry: Registry, force: bool, mut reporter: Reporter) -> Self {
        reporter.set_target_count(registry.len());
        Self {
            force,
            registry,
            last: None,
            reporter,
        }
    }
}

/// Result of the attach/probe phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Every pending target is now active, excluded or already done.
    Ready,
    /// This backend cannot work in the current environment. Nothing it
    /// touched is left behind; pending targets are pending again.
    Unavailable,
}

pub trait Backend {
    /// Takes hold of every pending target.
    fn visit(&mut self, cx: &mut Context) -> Result<Visit>;

    /// Blocks until the active count drops to zero.
    fn wait(&mut self, cx: &mut Context) -> Result<()>;
}
