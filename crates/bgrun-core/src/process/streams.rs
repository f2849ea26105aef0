//! Standard stream routing for the background process.
//!
//! After [`bind_standard_streams`] the background process has stdin on the
//! discard sink and stdout/stderr on the log destination, and none of the
//! descriptors used to get there remain open.

use crate::config::{LaunchDefaults, LogTarget};
use crate::error::{LaunchError, Result};
use crate::process::exec::ExecImage;
use nix::unistd::{dup2, fork, pipe, ForkResult, Pid};
use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::debug;

/// Open the discard sink for reading and writing.
pub fn open_discard_sink() -> Result<OwnedFd> {
    let path = Path::new(LaunchDefaults::DISCARD_SINK);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| LaunchError::io_with_path(e, path))?;
    lift_above_stdio(file.into())
}

/// Open `path` for appending, creating it owner-only if absent.
pub fn open_log_file(path: &Path) -> Result<OwnedFd> {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .mode(LaunchDefaults::LOG_FILE_MODE)
        .open(path)
        .map_err(|e| LaunchError::io_with_path(e, path))?;
    lift_above_stdio(file.into())
}

/// Establish the descriptor stdout and stderr will be bound to.
///
/// `relay` must be prepared when `target` is [`LogTarget::Relay`].
pub fn open_destination(
    target: &LogTarget,
    relay: Option<&ExecImage>,
    sink: &OwnedFd,
) -> Result<OwnedFd> {
    match (target, relay) {
        (LogTarget::File(path), _) => open_log_file(path),
        (LogTarget::Relay, Some(image)) => spawn_relay(image, sink).map(|(write_end, _)| write_end),
        (LogTarget::Relay, None) => Err(LaunchError::InvalidArgument {
            value: LaunchDefaults::RELAY_SENTINEL.to_string(),
            message: "no relay program prepared".to_string(),
        }),
    }
}

/// Fork the log relay with its stdin on a fresh pipe.
///
/// Returns the write end of the pipe and the relay's pid. The relay's own
/// stdout and stderr go to the discard sink.
pub fn spawn_relay(image: &ExecImage, sink: &OwnedFd) -> Result<(OwnedFd, Pid)> {
    let (read_end, write_end) = pipe().map_err(LaunchError::Pipe)?;
    let read_end = lift_above_stdio(read_end)?;
    let write_end = lift_above_stdio(write_end)?;
    let relay_sink = sink.try_clone()?;

    // SAFETY: the background process is single-threaded. The child only
    // rebinds descriptors and then execs or exits.
    #[allow(unsafe_code)]
    let forked = unsafe { fork() }.map_err(LaunchError::Fork)?;

    match forked {
        ForkResult::Child => {
            drop(write_end);
            // Errors are unreportable here: stderr may already be the sink.
            if bind_standard_streams(read_end, relay_sink).is_ok() {
                let _ = image.replace();
            }
            std::process::exit(libc::EXIT_FAILURE);
        }
        ForkResult::Parent { child } => {
            drop(read_end);
            drop(relay_sink);
            debug!(
                "Spawned relay {} with pid {}",
                image.program().display(),
                child
            );
            Ok((write_end, child))
        }
    }
}

/// Bind stdout and stderr to `output` and stdin to `input`, then close both
/// originals.
///
/// Neither descriptor may already occupy a standard slot.
pub fn bind_standard_streams(input: OwnedFd, output: OwnedFd) -> Result<()> {
    redirect(&output, libc::STDOUT_FILENO)?;
    redirect(&output, libc::STDERR_FILENO)?;
    redirect(&input, libc::STDIN_FILENO)?;
    drop(output);
    drop(input);
    Ok(())
}

fn redirect(from: &OwnedFd, to: RawFd) -> Result<()> {
    dup2(from.as_raw_fd(), to)
        .map(|_| ())
        .map_err(|source| LaunchError::Redirect { fd: to, source })
}

/// Move a descriptor out of slots 0-2 so a later `dup2` cannot clobber it.
///
/// This only triggers when the invoker started us with a standard stream
/// closed.
fn lift_above_stdio(fd: OwnedFd) -> Result<OwnedFd> {
    if fd.as_raw_fd() > libc::STDERR_FILENO {
        return Ok(fd);
    }
    // try_clone duplicates with F_DUPFD_CLOEXEC starting at 3.
    let lifted = fd.try_clone()?;
    drop(fd);
    Ok(lifted)
}
