use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use waitpid::{Config, Reporter};

fn main() -> ExitCode {
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(libc::EXIT_FAILURE as u8);
        }
        Err(e) => e.exit(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match waitpid::run(&config, Reporter::stdout(config.verbose)) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("waitpid: error: {e}");
            if e.is_config() {
                eprintln!("Try `waitpid --help' for more information.");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
