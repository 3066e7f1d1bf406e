//! Session identity and private state-file management
//!
//! A GRASS session is identified by its database root, its location, and a
//! session-state file (GISRC) naming the currently active mapset. Many
//! workers share one session root; each worker therefore operates against a
//! private pid-suffixed copy of the state file and hands that path
//! explicitly to every engine call. The shared original is never written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable holding the session-state file path
pub const STATE_FILE_VAR: &str = "GISRC";

/// Errors from session-state filesystem operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to remove {}: {}", .path.display(), .source)]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to copy {} to {}: {}", .src.display(), .dst.display(), .source)]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        source: io::Error,
    },
}

/// Identity of the engine session this worker runs against.
///
/// Read once from the engine at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Database root directory (GISDBASE)
    pub gisdbase: PathBuf,

    /// Location name within the database root
    pub location: String,

    /// Path of the session-state file (GISRC)
    pub state_file: PathBuf,
}

impl SessionInfo {
    /// Directory a mapset of this session occupies on disk
    pub fn mapset_path(&self, mapset: &str) -> PathBuf {
        self.gisdbase.join(&self.location).join(mapset)
    }
}

/// Per-call environment for engine invocations.
///
/// Holds the session-state pointer and the fixed tuning variables as an
/// explicit value instead of mutating the process environment. Concurrent
/// workers sharing one session root cannot observe each other's mapset
/// switches because each applies its own `SessionEnv` to its own engine
/// child processes only.
#[derive(Debug, Clone)]
pub struct SessionEnv {
    state_file: PathBuf,
    tuning: Vec<(String, String)>,
}

impl SessionEnv {
    /// Create an environment pointing at `state_file` with the given tuning
    /// variables
    pub fn new(state_file: impl Into<PathBuf>, tuning: Vec<(String, String)>) -> Self {
        Self {
            state_file: state_file.into(),
            tuning,
        }
    }

    /// The state file engine calls currently run against
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Repoint the session-state reference, e.g. to a private copy
    pub fn point_state_file_to(&mut self, path: impl Into<PathBuf>) {
        self.state_file = path.into();
    }

    /// Variables to apply to an engine child process
    pub fn vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::with_capacity(self.tuning.len() + 1);
        vars.push((
            STATE_FILE_VAR.to_string(),
            self.state_file.display().to_string(),
        ));
        vars.extend(self.tuning.iter().cloned());
        vars
    }
}

/// Remove a file if present. Absence is success.
pub fn ensure_file_absent(path: &Path) -> Result<(), SessionError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SessionError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove a directory tree if present. Absence is success.
pub fn ensure_dir_absent(path: &Path) -> Result<(), SessionError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SessionError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Private pid-suffixed copy of the session-state file.
///
/// Created before the mapset switch and released only after the output check
/// passes. There is deliberately no `Drop` cleanup: a failed run leaves the
/// copy on disk.
#[derive(Debug)]
pub struct PrivateStateFile {
    original: PathBuf,
    private: PathBuf,
}

impl PrivateStateFile {
    /// Copy `original` to `<original>_<pid>`, replacing any leftover file at
    /// that path
    pub fn create(original: &Path, pid: u32) -> Result<Self, SessionError> {
        let mut name = original.as_os_str().to_os_string();
        name.push(format!("_{pid}"));
        let private = PathBuf::from(name);

        ensure_file_absent(&private)?;
        fs::copy(original, &private).map_err(|source| SessionError::Copy {
            src: original.to_path_buf(),
            dst: private.clone(),
            source,
        })?;

        Ok(Self {
            original: original.to_path_buf(),
            private,
        })
    }

    /// Path of the private copy
    pub fn path(&self) -> &Path {
        &self.private
    }

    /// Path of the shared original
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Remove the private copy. Consumes the handle; the caller repoints its
    /// session environment back to the original.
    pub fn release(self) -> Result<(), SessionError> {
        ensure_file_absent(&self.private)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state_file_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("rc");
        fs::write(&path, "GISDBASE: /data/grassdata\nMAPSET: PERMANENT\n").unwrap();
        path
    }

    #[test]
    fn test_private_copy_created_with_pid_suffix() {
        let dir = TempDir::new().unwrap();
        let original = state_file_fixture(&dir);

        let private = PrivateStateFile::create(&original, 4242).unwrap();

        assert_eq!(
            private.path(),
            dir.path().join("rc_4242"),
            "copy path is original plus pid suffix"
        );
        assert!(private.path().exists());
        assert_eq!(
            fs::read_to_string(private.path()).unwrap(),
            fs::read_to_string(&original).unwrap(),
            "copy carries the original contents"
        );
    }

    #[test]
    fn test_leftover_private_copy_replaced() {
        let dir = TempDir::new().unwrap();
        let original = state_file_fixture(&dir);

        let leftover = dir.path().join("rc_77");
        fs::write(&leftover, "stale contents from a crashed run").unwrap();

        let private = PrivateStateFile::create(&original, 77).unwrap();
        assert_eq!(
            fs::read_to_string(private.path()).unwrap(),
            fs::read_to_string(&original).unwrap()
        );
    }

    #[test]
    fn test_release_removes_copy_and_keeps_original() {
        let dir = TempDir::new().unwrap();
        let original = state_file_fixture(&dir);

        let private = PrivateStateFile::create(&original, 1).unwrap();
        let copy_path = private.path().to_path_buf();
        private.release().unwrap();

        assert!(!copy_path.exists());
        assert!(original.exists());
    }

    #[test]
    fn test_ensure_file_absent_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone");

        ensure_file_absent(&path).unwrap();

        fs::write(&path, "x").unwrap();
        ensure_file_absent(&path).unwrap();
        assert!(!path.exists());
        ensure_file_absent(&path).unwrap();
    }

    #[test]
    fn test_ensure_dir_absent_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapset");

        ensure_dir_absent(&path).unwrap();

        fs::create_dir_all(path.join("cell")).unwrap();
        fs::write(path.join("cell").join("result"), "raster").unwrap();
        ensure_dir_absent(&path).unwrap();
        assert!(!path.exists());
        ensure_dir_absent(&path).unwrap();
    }

    #[test]
    fn test_session_env_vars_lead_with_state_file() {
        let mut env = SessionEnv::new(
            "/tmp/rc",
            vec![("GRASS_COMPRESSOR".to_string(), "LZ4".to_string())],
        );
        let vars = env.vars();
        assert_eq!(vars[0], (STATE_FILE_VAR.to_string(), "/tmp/rc".to_string()));
        assert_eq!(vars[1].1, "LZ4");

        env.point_state_file_to("/tmp/rc_99");
        assert_eq!(env.vars()[0].1, "/tmp/rc_99");
    }

    #[test]
    fn test_mapset_path() {
        let info = SessionInfo {
            gisdbase: PathBuf::from("/data/grassdata"),
            location: "nc_spm".to_string(),
            state_file: PathBuf::from("/tmp/rc"),
        };
        assert_eq!(
            info.mapset_path("tile_01"),
            PathBuf::from("/data/grassdata/nc_spm/tile_01")
        );
    }
}
