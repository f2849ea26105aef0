//! Launch configuration.
//!
//! Holds the defaults the launcher falls back to and the resolved
//! [`LaunchConfig`] handed to [`crate::launch`].

use crate::error::{LaunchError, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default values for the launch protocol.
pub struct LaunchDefaults;

impl LaunchDefaults {
    /// Log destination used when none is given.
    pub const LOG_FILE: &'static str = "/dev/null";
    /// Directory the default pid file is placed in.
    pub const PID_DIR: &'static str = "/var/run";
    pub const PID_FILE_SUFFIX: &'static str = ".pid";
    /// Path of the system log relay.
    pub const RELAY_PROGRAM: &'static str = "/usr/bin/logger";
    /// Value of the log option that selects the system log relay.
    pub const RELAY_SENTINEL: &'static str = "=logger";
    /// How long the controller waits before checking on the child.
    pub const DETECTION_WINDOW: Duration = Duration::from_secs(1);
    /// Discard sink shared by stdin and the relay's own output.
    pub const DISCARD_SINK: &'static str = "/dev/null";

    // File modes
    pub const PID_FILE_MODE: u32 = 0o644;
    pub const LOG_FILE_MODE: u32 = 0o600;
}

/// Where the background process's stdout and stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to a plain file.
    File(PathBuf),
    /// Pipe into the system log relay.
    Relay,
}

impl Default for LogTarget {
    fn default() -> Self {
        LogTarget::File(PathBuf::from(LaunchDefaults::LOG_FILE))
    }
}

impl FromStr for LogTarget {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(LaunchError::InvalidArgument {
                value: s.to_string(),
                message: "log target must not be empty".to_string(),
            });
        }
        if s == LaunchDefaults::RELAY_SENTINEL {
            Ok(LogTarget::Relay)
        } else {
            Ok(LogTarget::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::File(path) => write!(f, "{}", path.display()),
            LogTarget::Relay => f.write_str(LaunchDefaults::RELAY_SENTINEL),
        }
    }
}

/// Resolved configuration for one launch.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Destination of stdout and stderr.
    pub log_target: LogTarget,
    /// Path of the pid file.
    pub pid_file: PathBuf,
    /// Program to run.
    pub program: PathBuf,
    /// Full argument vector, argv[0] included.
    pub args: Vec<OsString>,
    /// Relay invoked in [`LogTarget::Relay`] mode.
    pub relay_program: PathBuf,
    /// Delay before the controller checks whether the child died.
    pub detection_window: Duration,
}

impl LaunchConfig {
    /// Build a config from a command line whose first element is the program.
    ///
    /// The pid file defaults to `/var/run/<base name>.pid`.
    pub fn new<I, S>(command: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = command.into_iter().map(Into::into).collect();
        let program = args
            .first()
            .map(PathBuf::from)
            .ok_or(LaunchError::MissingProgram)?;
        if program.as_os_str().is_empty() {
            return Err(LaunchError::MissingProgram);
        }
        let pid_file = default_pid_file(&program);

        Ok(Self {
            log_target: LogTarget::default(),
            pid_file,
            program,
            args,
            relay_program: PathBuf::from(LaunchDefaults::RELAY_PROGRAM),
            detection_window: LaunchDefaults::DETECTION_WINDOW,
        })
    }

    /// Set the log target.
    pub fn with_log_target(mut self, target: LogTarget) -> Self {
        self.log_target = target;
        self
    }

    /// Set the pid file path.
    pub fn with_pid_file(mut self, path: impl AsRef<Path>) -> Self {
        self.pid_file = path.as_ref().to_path_buf();
        self
    }

    /// Set the relay program.
    pub fn with_relay_program(mut self, path: impl AsRef<Path>) -> Self {
        self.relay_program = path.as_ref().to_path_buf();
        self
    }

    /// Set the detection window.
    pub fn with_detection_window(mut self, window: Duration) -> Self {
        self.detection_window = window;
        self
    }

    /// Short program name used in reports and as the relay tag.
    pub fn program_name(&self) -> String {
        base_name(&self.program)
    }
}

/// Last path component of `program`, or the whole string when it has none.
pub fn base_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Default pid file location for `program`.
pub fn default_pid_file(program: &Path) -> PathBuf {
    Path::new(LaunchDefaults::PID_DIR).join(format!(
        "{}{}",
        base_name(program),
        LaunchDefaults::PID_FILE_SUFFIX
    ))
}
