//! bgrun core - run a program detached in the background.
//!
//! The launcher forks, lets the child take over a new session, write its pid
//! file and route its output, then execs the target program. The invoking
//! process waits one detection window and fails if the child is already gone.
//!
//! # Example
//!
//! ```rust,ignore
//! use bgrun_core::{launch, LaunchConfig};
//!
//! let config = LaunchConfig::new(["/usr/sbin/mydaemon", "--foreground"])?;
//! let pid = launch(&config)?;
//! ```

#[cfg(not(unix))]
compile_error!("bgrun only supports Unix platforms");

pub mod config;
pub mod error;
pub mod process;

// Re-export commonly used types
pub use config::{LaunchConfig, LaunchDefaults, LogTarget};
pub use error::{LaunchError, Result};
pub use process::{launch, TerminationCause};
