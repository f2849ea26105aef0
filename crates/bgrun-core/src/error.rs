//! Error types for bgrun.
//!
//! Every failure of the launch protocol maps to one variant here. Errors never
//! cross a fork boundary: the background and relay processes report their own
//! errors and exit, and the controller only sees their exit status.

use std::path::PathBuf;
use thiserror::Error;

use crate::process::TerminationCause;

/// Main error type for the bgrun library.
#[derive(Debug, Error)]
pub enum LaunchError {
    // Configuration errors
    #[error("Please specify a program to run!")]
    MissingProgram,

    #[error("Invalid argument {value:?}: {message}")]
    InvalidArgument { value: String, message: String },

    // Resource errors
    #[error("{}{message}", path_prefix(.path))]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to create pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("Failed to redirect descriptor {fd}: {source}")]
    Redirect {
        fd: i32,
        #[source]
        source: nix::Error,
    },

    // Process errors
    #[error("fork: {0}")]
    Fork(#[source] nix::Error),

    #[error("Failed to create session: {0}")]
    Session(#[source] nix::Error),

    #[error("Failed to check status of {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: nix::Error,
    },

    #[error("{program} {cause}")]
    ImmediateTermination {
        program: String,
        cause: TerminationCause,
    },

    #[error("execvp {}: {source}", .program.display())]
    Exec {
        program: PathBuf,
        #[source]
        source: nix::Error,
    },
}

fn path_prefix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!("{}: ", p.display()))
        .unwrap_or_default()
}

/// Result type alias for bgrun operations.
pub type Result<T> = std::result::Result<T, LaunchError>;

impl From<std::io::Error> for LaunchError {
    fn from(err: std::io::Error) -> Self {
        LaunchError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl LaunchError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LaunchError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the error was raised before any process was created.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LaunchError::MissingProgram | LaunchError::InvalidArgument { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    #[test]
    fn test_error_display() {
        let err = LaunchError::ImmediateTermination {
            program: "false".into(),
            cause: TerminationCause::Exited(1),
        };
        assert_eq!(err.to_string(), "false exited with code 1");
    }

    #[test]
    fn test_signal_display_mentions_core_dump() {
        let err = LaunchError::ImmediateTermination {
            program: "crashy".into(),
            cause: TerminationCause::Signaled {
                signal: Signal::SIGSEGV,
                core_dumped: true,
            },
        };
        assert_eq!(
            err.to_string(),
            "crashy terminated immediately by SIGSEGV (core dumped)"
        );
    }

    #[test]
    fn test_io_with_path() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = LaunchError::io_with_path(io, "/var/run/x.pid");
        assert!(err.to_string().starts_with("/var/run/x.pid: "), "{}", err);
        assert!(!err.to_string().contains("Some("));
        match err {
            LaunchError::Io { path, source, .. } => {
                assert_eq!(path, Some(PathBuf::from("/var/run/x.pid")));
                assert!(source.is_some());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_io_without_path() {
        let err = LaunchError::from(std::io::Error::other("boom"));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_error_classification() {
        assert!(LaunchError::MissingProgram.is_configuration_error());
        assert!(!LaunchError::Fork(nix::Error::EAGAIN).is_configuration_error());
        assert!(!LaunchError::ImmediateTermination {
            program: "x".into(),
            cause: TerminationCause::Stopped,
        }
        .is_configuration_error());
    }
}
