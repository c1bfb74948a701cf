use std::fmt;

use crate::signame::signame;

/// How a target ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(u8),
    Killed { signal: i32, core_dumped: bool },
}

impl Termination {
    /// Shell convention: the exit code itself, or `128 + signal`.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Exited(code) => code,
            Self::Killed { signal, .. } => (signal | 0x80) as u8,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Killed {
                signal,
                core_dumped: false,
            } => write!(f, "killed by {}", signame(signal)),
            Self::Killed {
                signal,
                core_dumped: true,
            } => write!(f, "killed by {} (core dumped)", signame(signal)),
        }
    }
}

/// Which strategy carried the run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Trace,
    Poll,
}

/// Result of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub strategy: Strategy,
    /// Status of the most recently retired target, if any was observed.
    pub last: Option<Termination>,
}

impl Outcome {
    /// The program's own exit code.
    ///
    /// Polling cannot observe how a process ended, so a polled run always
    /// succeeds.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match (self.strategy, self.last) {
            (Strategy::Trace, Some(last)) => last.code(),
            (Strategy::Trace, None) | (Strategy::Poll, _) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Termination::Exited(0), 0)]
    #[case(Termination::Exited(7), 7)]
    #[case(Termination::Exited(255), 255)]
    #[case(Termination::Killed { signal: libc::SIGKILL, core_dumped: false }, 137)]
    #[case(Termination::Killed { signal: libc::SIGTERM, core_dumped: false }, 143)]
    #[case(Termination::Killed { signal: libc::SIGSEGV, core_dumped: true }, 139)]
    fn termination_codes(#[case] t: Termination, #[case] expected: u8) {
        assert_eq!(t.code(), expected);
    }

    #[rstest]
    #[case(Termination::Exited(3), "exited with status 3")]
    #[case(Termination::Killed { signal: libc::SIGTERM, core_dumped: false }, "killed by SIGTERM")]
    #[case(Termination::Killed { signal: libc::SIGABRT, core_dumped: true }, "killed by SIGABRT (core dumped)")]
    fn termination_display(#[case] t: Termination, #[case] expected: &str) {
        assert_eq!(t.to_string(), expected);
    }

    #[test]
    fn traced_run_reuses_last_status() {
        let outcome = Outcome {
            strategy: Strategy::Trace,
            last: Some(Termination::Exited(3)),
        };
        assert_eq!(outcome.exit_code(), 3);
    }

    #[test]
    fn traced_run_without_retirements_succeeds() {
        let outcome = Outcome {
            strategy: Strategy::Trace,
            last: None,
        };
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn polled_run_always_succeeds() {
        let outcome = Outcome {
            strategy: Strategy::Poll,
            last: Some(Termination::Killed {
                signal: libc::SIGKILL,
                core_dumped: false,
            }),
        };
        assert_eq!(outcome.exit_code(), 0);
    }
}
