//! Session leadership and the pid file.

use crate::config::LaunchDefaults;
use crate::error::{LaunchError, Result};
use nix::unistd::{setsid, Pid};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::debug;

/// Detach from the controlling terminal by starting a new session.
///
/// Returns the session id, which equals the caller's pid.
pub fn become_session_leader() -> Result<Pid> {
    let pid = setsid().map_err(LaunchError::Session)?;
    debug!("Started new session {}", pid);
    Ok(pid)
}

/// Write `pid` in decimal to `path`, truncating any previous content.
pub fn write_pid_file(path: &Path, pid: Pid) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(LaunchDefaults::PID_FILE_MODE)
        .open(path)
        .map_err(|e| LaunchError::io_with_path(e, path))?;

    file.write_all(pid.to_string().as_bytes())
        .map_err(|e| LaunchError::io_with_path(e, path))?;

    debug!("Wrote pid {} to {}", pid, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_pid_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.pid");

        write_pid_file(&path, Pid::from_raw(12345)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "12345");
    }

    #[test]
    fn test_pid_file_is_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.pid");
        fs::write(&path, "9999999\nstale").unwrap();

        write_pid_file(&path, Pid::from_raw(42)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "42");
    }

    #[test]
    fn test_pid_file_has_no_execute_bits() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.pid");

        write_pid_file(&path, Pid::from_raw(7)).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0);
        assert_eq!(mode & 0o600, 0o600);
    }

    #[test]
    fn test_pid_file_error_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("test.pid");

        let err = write_pid_file(&path, Pid::from_raw(7)).unwrap_err();

        match err {
            LaunchError::Io { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
