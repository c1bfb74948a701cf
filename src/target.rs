//! The set of processes a run waits for.

use rustix::process::Pid;

use crate::error::{Error, Result};

/// Where a target is in its lifecycle. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Not attached to or probed yet.
    Pending,
    /// Attached (trace) or confirmed alive (poll).
    Active,
    /// Skipped under force mode, never waited for.
    Excluded,
    /// Terminated.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pid: Pid,
    state: TargetState,
}

impl Target {
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn raw(&self) -> i32 {
        self.pid.as_raw_nonzero().get()
    }

    #[inline]
    pub fn state(&self) -> TargetState {
        self.state
    }
}

/// Deduplicated targets in order of first appearance, plus the count of
/// targets still being waited on.
#[derive(Debug, Default)]
pub struct Registry {
    targets: Vec<Target>,
    active: usize,
}

impl Registry {
    /// Parses and deduplicates `pids`. Any malformed or out-of-range entry
    /// fails the whole registration.
    pub fn register<I, S>(pids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets: Vec<Target> = Vec::new();

        for s in pids {
            let pid = parse_pid(s.as_ref())?;
            if targets.iter().all(|t| t.pid != pid) {
                targets.push(Target {
                    pid,
                    state: TargetState::Pending,
                });
            }
        }

        Ok(Self { targets, active: 0 })
    }

    /// Refuses a target equal to the caller's own PID, or excludes it when
    /// `force` is set. Tracing ourselves would deadlock.
    pub fn exclude_self(&mut self, own: Pid, force: bool) -> Result<()> {
        let Some(idx) = self.position(own) else {
            return Ok(());
        };

        if !force {
            return Err(Error::SelfTraceRefused(own.as_raw_nonzero().get()));
        }

        tracing::debug!(pid = own.as_raw_nonzero().get(), "excluding own process");
        self.exclude(idx);
        Ok(())
    }

    /// Marks a pending target as skipped.
    pub fn exclude(&mut self, idx: usize) {
        if let Some(t) = self.targets.get_mut(idx) {
            if t.state == TargetState::Pending {
                t.state = TargetState::Excluded;
            }
        }
    }

    /// Moves a pending target to active and counts it.
    pub fn activate(&mut self, idx: usize) {
        if let Some(t) = self.targets.get_mut(idx) {
            if t.state == TargetState::Pending {
                t.state = TargetState::Active;
                self.active += 1;
            }
        }
    }

    /// Marks a target terminated. Returns `true` if it was active, in which
    /// case the active count drops by one; repeated calls are no-ops.
    pub fn finish(&mut self, idx: usize) -> bool {
        let Some(t) = self.targets.get_mut(idx) else {
            return false;
        };

        match t.state {
            TargetState::Active => {
                t.state = TargetState::Done;
                self.active -= 1;
                true
            }
            TargetState::Pending => {
                t.state = TargetState::Done;
                false
            }
            TargetState::Excluded | TargetState::Done => false,
        }
    }

    /// Puts an active target back to pending without retiring it, used when
    /// a strategy gives up its hold on the target before handing over.
    pub fn release(&mut self, idx: usize) {
        if let Some(t) = self.targets.get_mut(idx) {
            if t.state == TargetState::Active {
                t.state = TargetState::Pending;
                self.active -= 1;
            }
        }
    }

    pub fn position(&self, pid: Pid) -> Option<usize> {
        self.targets.iter().position(|t| t.pid == pid)
    }

    /// Indices of targets in `state`, in registration order.
    pub fn indices(&self, state: TargetState) -> Vec<usize> {
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state == state)
            .map(|(i, _)| i)
            .collect()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Target> {
        self.targets.get(idx)
    }

    #[inline]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Parses a decimal PID in `1..=pid_t::MAX`.
pub fn parse_pid(s: &str) -> Result<Pid> {
    let invalid = || Error::InvalidPid(s.to_owned());

    let raw = s.parse::<i64>().map_err(|_| invalid())?;
    let raw = i32::try_from(raw).map_err(|_| invalid())?;
    if raw < 1 {
        return Err(invalid());
    }

    Pid::from_raw(raw).ok_or_else(invalid)
}
