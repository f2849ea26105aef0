//! Process launching.
//!
//! Runs a program detached in the background and reports whether it survived
//! its first moments.
//!
//! # Launch Sequence
//!
//! 1. **Detach** - fork, then the parent waits a fixed window and checks the
//!    child's status without blocking
//! 2. **Session** - the child starts a new session and writes its pid file
//! 3. **Streams** - stdin goes to `/dev/null`, stdout and stderr to a log file
//!    or to a `logger` relay over a pipe
//! 4. **Exec** - the child becomes the target program
//!
//! # Example
//!
//! ```rust,no_run
//! use bgrun_core::{launch, LaunchConfig, LogTarget};
//!
//! fn main() -> bgrun_core::Result<()> {
//!     let config = LaunchConfig::new(["/bin/sleep", "60"])?
//!         .with_log_target(LogTarget::File("/tmp/sleep.log".into()))
//!         .with_pid_file("/tmp/sleep.pid");
//!
//!     let pid = launch(&config)?;
//!     println!("PID: {}", pid);
//!     Ok(())
//! }
//! ```

mod detach;
mod exec;
mod outcome;
mod session;
mod streams;

pub use detach::launch;
pub use exec::ExecImage;
pub use outcome::TerminationCause;
pub use session::{become_session_leader, write_pid_file};
pub use streams::{
    bind_standard_streams, open_destination, open_discard_sink, open_log_file, spawn_relay,
};
