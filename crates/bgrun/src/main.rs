//! bgrun - run a program in the background.
//!
//! Forks the program off into its own session, records its pid, sends its
//! output to a log file or the system log, and exits non-zero if the program
//! dies within the detection window.

use anyhow::{Context, Result};
use bgrun_core::{LaunchConfig, LaunchDefaults, LaunchError, LogTarget};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "bgrun")]
#[command(about = "Run a program detached in the background")]
struct Args {
    /// Log file for stdout and stderr, or `=logger` for the system log
    #[arg(short = 'l', long = "log", value_name = "TARGET")]
    log: Option<LogTarget>,

    /// Pid file path (defaults to /var/run/<program>.pid)
    #[arg(short = 'p', long = "pid-file", value_name = "PATH")]
    pid_file: Option<PathBuf>,

    /// How long to watch the program for an immediate failure
    #[arg(short = 'w', long = "wait", value_name = "MILLIS", default_value_t = 1000)]
    wait_ms: u64,

    /// Relay program used with `-l =logger`
    #[arg(long, value_name = "PATH", default_value = LaunchDefaults::RELAY_PROGRAM)]
    relay: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, value_name = "COMMAND")]
    command: Vec<OsString>,
}

impl Args {
    /// Resolve the parsed options into a launch configuration.
    fn into_config(self) -> Result<LaunchConfig> {
        let mut config = LaunchConfig::new(self.command)
            .context("invalid command line")?
            .with_relay_program(&self.relay)
            .with_detection_window(Duration::from_millis(self.wait_ms));

        if let Some(target) = self.log {
            config = config.with_log_target(target);
        }
        if let Some(pid_file) = self.pid_file {
            config = config.with_pid_file(pid_file);
        }
        Ok(config)
    }
}

/// Usage errors share clap's exit code; everything else is a launch failure.
const USAGE_ERROR: u8 = 2;
const LAUNCH_FAILURE: u8 = 1;

fn exit_status(err: &LaunchError) -> u8 {
    if err.is_configuration_error() {
        USAGE_ERROR
    } else {
        LAUNCH_FAILURE
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // stdout is left alone; diagnostics go to stderr.
    let log_level = if args.debug { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{:#}", err);
            return ExitCode::from(USAGE_ERROR);
        }
    };
    debug!("Resolved config: {:?}", config);

    match bgrun_core::launch(&config) {
        Ok(pid) => {
            debug!("{} running as {}", config.program_name(), pid);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(exit_status(&err))
        }
    }
}
