//! Classification of a child that changed state inside the detection window.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use std::fmt;

/// Why a freshly launched child is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// Killed by a signal.
    Signaled { signal: Signal, core_dumped: bool },
    /// Stopped by a signal.
    Stopped,
    /// Exited on its own. A zero code still counts as a failed launch.
    Exited(i32),
    /// Any other state change reported by `waitpid`.
    Unknown,
}

impl TerminationCause {
    /// Map a non-blocking wait result to a cause, or `None` if the child is
    /// still running.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::StillAlive => None,
            WaitStatus::Exited(_, code) => Some(TerminationCause::Exited(code)),
            WaitStatus::Signaled(_, signal, core_dumped) => Some(TerminationCause::Signaled {
                signal,
                core_dumped,
            }),
            WaitStatus::Stopped(..) => Some(TerminationCause::Stopped),
            _ => Some(TerminationCause::Unknown),
        }
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationCause::Signaled {
                signal,
                core_dumped,
            } => {
                write!(f, "terminated immediately by {}", signal.as_str())?;
                if *core_dumped {
                    f.write_str(" (core dumped)")?;
                }
                Ok(())
            }
            TerminationCause::Stopped => f.write_str("stopped immediately"),
            TerminationCause::Exited(code) => write!(f, "exited with code {}", code),
            TerminationCause::Unknown => f.write_str("ended in an unknown state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    fn pid() -> Pid {
        Pid::from_raw(4242)
    }

    #[test]
    fn test_still_alive_is_not_a_termination() {
        assert_eq!(TerminationCause::from_wait_status(WaitStatus::StillAlive), None);
    }

    #[test]
    fn test_clean_exit_is_still_reported() {
        let cause = TerminationCause::from_wait_status(WaitStatus::Exited(pid(), 0));
        assert_eq!(cause, Some(TerminationCause::Exited(0)));
        assert_eq!(cause.unwrap().to_string(), "exited with code 0");
    }

    #[test]
    fn test_signaled() {
        let cause =
            TerminationCause::from_wait_status(WaitStatus::Signaled(pid(), Signal::SIGKILL, false))
                .unwrap();
        assert_eq!(cause.to_string(), "terminated immediately by SIGKILL");
    }

    #[test]
    fn test_stopped() {
        let cause =
            TerminationCause::from_wait_status(WaitStatus::Stopped(pid(), Signal::SIGSTOP)).unwrap();
        assert_eq!(cause, TerminationCause::Stopped);
        assert_eq!(cause.to_string(), "stopped immediately");
    }

    #[test]
    fn test_continued_is_unknown() {
        let cause = TerminationCause::from_wait_status(WaitStatus::Continued(pid()));
        assert_eq!(cause, Some(TerminationCause::Unknown));
    }
}
