//! The launch protocol: fork, detect early failure, and hand the background
//! process over to the target program.

use crate::config::{LaunchConfig, LogTarget};
use crate::error::{LaunchError, Result};
use crate::process::exec::ExecImage;
use crate::process::outcome::TerminationCause;
use crate::process::{session, streams};
use nix::sys::wait::{waitpid, WaitPidFlag};
use nix::unistd::{fork, ForkResult, Pid};
use std::convert::Infallible;
use std::os::fd::OwnedFd;
use std::thread;
use tracing::{debug, info};

/// Exec images for one launch, built before the first fork.
#[derive(Debug)]
struct LaunchImages {
    target: ExecImage,
    relay: Option<ExecImage>,
}

impl LaunchImages {
    fn prepare(config: &LaunchConfig) -> Result<Self> {
        let target = ExecImage::new(&config.program, &config.args)?;
        let relay = match config.log_target {
            LogTarget::Relay => Some(ExecImage::relay(
                &config.relay_program,
                &config.program_name(),
            )?),
            LogTarget::File(_) => None,
        };
        Ok(Self { target, relay })
    }
}

/// Launch `config.program` detached in the background.
///
/// Returns the background pid once the child has survived
/// `config.detection_window`. Any state change inside the window, including
/// a clean exit, is reported as [`LaunchError::ImmediateTermination`].
///
/// Must be called while the process is single-threaded: the forked child
/// allocates before it execs.
pub fn launch(config: &LaunchConfig) -> Result<Pid> {
    let images = LaunchImages::prepare(config)?;
    let sink = streams::open_discard_sink()?;

    info!(
        "Launching {} (log: {}, pid file: {})",
        config.program.display(),
        config.log_target,
        config.pid_file.display()
    );

    // SAFETY: the launcher runs no other threads, so the child cannot
    // inherit a lock held elsewhere.
    #[allow(unsafe_code)]
    let forked = unsafe { fork() }.map_err(LaunchError::Fork)?;

    match forked {
        ForkResult::Parent { child } => {
            drop(sink);
            supervise(config, child)
        }
        ForkResult::Child => run_background(config, &images, sink),
    }
}

/// Wait out the detection window, then check on the child without blocking.
fn supervise(config: &LaunchConfig, child: Pid) -> Result<Pid> {
    let program = config.program_name();
    debug!(
        "Waiting {:?} for {} (pid {})",
        config.detection_window, program, child
    );
    thread::sleep(config.detection_window);

    let status = waitpid(child, Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED)).map_err(
        |source| LaunchError::Wait {
            program: program.clone(),
            source,
        },
    )?;

    match TerminationCause::from_wait_status(status) {
        Some(cause) => Err(LaunchError::ImmediateTermination { program, cause }),
        None => {
            info!("Launched {} with PID {}", program, child);
            Ok(child)
        }
    }
}

/// Background side of the fork. Never returns.
fn run_background(config: &LaunchConfig, images: &LaunchImages, sink: OwnedFd) -> ! {
    let err = match exec_background(config, images, sink) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    // Before stream routing this reaches the invoker's terminal, afterwards
    // the log destination.
    eprintln!("{}", err);
    std::process::exit(libc::EXIT_FAILURE);
}

fn exec_background(
    config: &LaunchConfig,
    images: &LaunchImages,
    sink: OwnedFd,
) -> Result<Infallible> {
    let pid = session::become_session_leader()?;
    session::write_pid_file(&config.pid_file, pid)?;

    let destination = streams::open_destination(&config.log_target, images.relay.as_ref(), &sink)?;
    streams::bind_standard_streams(sink, destination)?;

    Err(images.target.replace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::Path;

    #[test]
    fn test_images_for_file_target() {
        let config = LaunchConfig::new(["/bin/sleep", "5"]).unwrap();
        let images = LaunchImages::prepare(&config).unwrap();

        assert_eq!(images.target.program(), Path::new("/bin/sleep"));
        assert_eq!(images.target.argv().len(), 2);
        assert!(images.relay.is_none());
    }

    #[test]
    fn test_images_for_relay_target() {
        let config = LaunchConfig::new(["/opt/app/bin/myprog"])
            .unwrap()
            .with_log_target(LogTarget::Relay);
        let images = LaunchImages::prepare(&config).unwrap();

        let relay = images.relay.unwrap();
        let tag = relay.argv().last().unwrap().to_str().unwrap();
        assert_eq!(tag, "myprog");
    }

    #[test]
    fn test_bad_argument_fails_before_fork() {
        use std::os::unix::ffi::OsStringExt;

        let config = LaunchConfig::new([
            OsString::from("/bin/echo"),
            OsString::from_vec(b"nul\0inside".to_vec()),
        ])
        .unwrap();

        let err = launch(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
