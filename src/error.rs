use std::io;

use thiserror::Error;

/// Everything that can abort a run.
///
/// Runtime variants name the PID they were raised for and keep the
/// underlying system error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("expected at least one PID")]
    NoTargets,

    #[error("invalid PID: {0}")]
    InvalidPid(String),

    #[error("refusing to trace own process {0}")]
    SelfTraceRefused(i32),

    #[error("no such process: {0}")]
    NoSuchProcess(i32),

    #[error("cannot attach to {pid}: {source}")]
    AttachFailed { pid: i32, source: io::Error },

    #[error("cannot detach from {pid}: {source}")]
    DetachFailed { pid: i32, source: io::Error },

    #[error("cannot resume {pid}: {source}")]
    ResumeFailed { pid: i32, source: io::Error },

    #[error("wait failed: {0}")]
    WaitFailed(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Exit code of the whole program when this error aborts the run.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        libc::EXIT_FAILURE as u8
    }

    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::NoTargets | Self::InvalidPid(_))
    }
}

#[inline]
pub(crate) fn is_errno(e: &io::Error, errno: i32) -> bool {
    e.raw_os_error() == Some(errno)
}
