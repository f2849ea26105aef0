//! Program image replacement.
//!
//! Argument vectors are converted to C strings before any fork so a bad
//! argument is a configuration error in the invoking process rather than a
//! silent failure in the background.

use crate::error::{LaunchError, Result};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::execvp;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// A program path and argument vector ready for `execvp`.
#[derive(Debug, Clone)]
pub struct ExecImage {
    program: PathBuf,
    path: CString,
    argv: Vec<CString>,
}

impl ExecImage {
    /// Prepare an image for `program` with the full argument vector `args`.
    pub fn new<I, S>(program: &Path, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = to_cstring(program.as_os_str())?;
        let argv = args
            .into_iter()
            .map(|arg| to_cstring(arg.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            program: program.to_path_buf(),
            path,
            argv,
        })
    }

    /// Image of the system log relay, tagging each line with `tag`.
    pub fn relay(relay_program: &Path, tag: &str) -> Result<Self> {
        let program = relay_program.as_os_str();
        Self::new(
            relay_program,
            [program, OsStr::new("-i"), OsStr::new("-t"), OsStr::new(tag)],
        )
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// Replace the current process image. Only returns on failure.
    ///
    /// A program without a slash is looked up in `PATH`. SIGPIPE is put back
    /// to its default disposition first: the Rust runtime ignores it, and an
    /// ignored signal survives exec.
    pub fn replace(&self) -> LaunchError {
        // SAFETY: installs SIG_DFL, not a handler, in a single-threaded child
        // that is about to exec.
        #[allow(unsafe_code)]
        let restored = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
        if let Err(source) = restored {
            return LaunchError::Exec {
                program: self.program.clone(),
                source,
            };
        }

        match execvp(&self.path, &self.argv) {
            Ok(never) => match never {},
            Err(source) => LaunchError::Exec {
                program: self.program.clone(),
                source,
            },
        }
    }
}

fn to_cstring(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes()).map_err(|_| LaunchError::InvalidArgument {
        value: value.to_string_lossy().into_owned(),
        message: "contains an interior NUL byte".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    #[test]
    fn test_argv_is_passed_verbatim() {
        let image = ExecImage::new(Path::new("/bin/echo"), ["/bin/echo", "-n", "hi there"]).unwrap();

        let argv: Vec<&str> = image.argv().iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(argv, ["/bin/echo", "-n", "hi there"]);
        assert_eq!(image.program(), Path::new("/bin/echo"));
    }

    #[test]
    fn test_relay_arguments() {
        let image = ExecImage::relay(Path::new("/usr/bin/logger"), "myprog").unwrap();

        let argv: Vec<&str> = image.argv().iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(argv, ["/usr/bin/logger", "-i", "-t", "myprog"]);
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        let bad = OsString::from_vec(b"a\0b".to_vec());
        let result = ExecImage::new(Path::new("/bin/echo"), [OsString::from("/bin/echo"), bad]);

        let err = result.unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_non_utf8_arguments_survive() {
        let raw = OsString::from_vec(vec![0x66, 0xff, 0x6f]);
        let image = ExecImage::new(Path::new("/bin/echo"), [raw]).unwrap();
        assert_eq!(image.argv()[0].as_bytes(), &[0x66, 0xff, 0x6f]);
    }
}
