use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Wait for process termination.
///
/// Exits as soon as all the given processes have exited. The exit status is
/// the one of the process that exited last.
#[derive(Debug, Clone, Parser)]
#[command(name = "waitpid", version, about)]
pub struct Config {
    /// Do not fail if one of the given PIDs cannot be traced.
    #[arg(short, long)]
    pub force: bool,

    /// Print information on status changes of the processes.
    #[arg(short, long)]
    pub verbose: bool,

    /// Seconds between liveness checks when tracing is unavailable.
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        default_value = "0.5",
        value_parser = parse_interval
    )]
    pub interval: Duration,

    /// Never trace; only poll for process existence.
    #[arg(long)]
    pub no_trace: bool,

    /// Processes to wait for.
    #[arg(value_name = "PID", allow_negative_numbers = true)]
    pub pids: Vec<String>,
}

impl Config {
    pub fn new<I, S>(pids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            force: false,
            verbose: false,
            interval: DEFAULT_INTERVAL,
            no_trace: false,
            pids: pids.into_iter().map(Into::into).collect(),
        }
    }

    /// At least one PID is required unless `force` is set.
    pub fn validate(&self) -> Result<()> {
        if self.pids.is_empty() && !self.force {
            return Err(Error::NoTargets);
        }
        Ok(())
    }
}

fn parse_interval(s: &str) -> std::result::Result<Duration, String> {
    let secs = s
        .parse::<f64>()
        .map_err(|_| format!("`{s}` is not a number"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("`{s}` is not a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn parse(args: &[&str]) -> clap::error::Result<Config> {
        Config::try_parse_from(std::iter::once("waitpid").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = parse(&["12", "34"]).unwrap();
        assert!(!config.force);
        assert!(!config.verbose);
        assert!(!config.no_trace);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.pids, ["12", "34"]);
    }

    #[test]
    fn flags() {
        let config = parse(&["-fv", "--interval", "2.5", "--no-trace", "1"]).unwrap();
        assert!(config.force);
        assert!(config.verbose);
        assert!(config.no_trace);
        assert_eq!(config.interval, Duration::from_millis(2500));
    }

    #[test]
    fn negative_pids_reach_the_registry() {
        let config = parse(&["-5"]).unwrap();
        assert_eq!(config.pids, ["-5"]);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("nan")]
    #[case("inf")]
    #[case("soon")]
    fn rejects_bad_intervals(#[case] value: &str) {
        assert!(parse(&["-i", value, "1"]).is_err());
    }

    #[test]
    fn empty_pid_list_needs_force() {
        let config = parse(&[]).unwrap();
        assert!(matches!(config.validate(), Err(Error::NoTargets)));

        let config = parse(&["--force"]).unwrap();
        assert!(config.validate().is_ok());
    }
}
