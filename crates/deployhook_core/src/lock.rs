//! Per-repository deployment locks.
//!
//! Two deployments of the same working tree must never overlap: the second
//! one would capture a stale anchor commit. The lock is an advisory
//! `flock(LOCK_EX | LOCK_NB)` on `<lock_dir>/<repository>.lock`, so it is
//! shared by every process pointed at the same lock directory (the webhook
//! server and `deployhook test`) as well as by independent handles inside
//! one process.
//!
//! The kernel drops the lock when the holding file is closed, including when
//! the process dies, so a crash never leaves a repository locked.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::logger::sanitize;

/// Lock files for every repository, one per name.
///
/// Acquisition never waits: a second deployment of the same repository is
/// refused while the first one holds its [`DeployGuard`].
#[derive(Debug, Clone)]
pub struct DeployLocks {
    lock_dir: PathBuf,
}

impl DeployLocks {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn lock_path(&self, repository: &str) -> PathBuf {
        self.lock_dir.join(format!("{}.lock", sanitize(repository)))
    }

    /// Lock `repository`, or `Ok(None)` if another holder has it.
    pub fn try_acquire(&self, repository: &str) -> CoreResult<Option<DeployGuard>> {
        fs::create_dir_all(&self.lock_dir)?;
        let path = self.lock_path(repository);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        if !try_flock_exclusive(&file).map_err(|e| lock_error(&path, e))? {
            debug!("Deployment lock {} is held", path.display());
            return Ok(None);
        }

        debug!("Acquired deployment lock {}", path.display());
        Ok(Some(DeployGuard {
            _file: file,
            repository: repository.to_string(),
        }))
    }

    /// Whether some holder currently has `repository` locked.
    pub fn is_locked(&self, repository: &str) -> CoreResult<bool> {
        let path = self.lock_path(repository);
        if !path.exists() {
            return Ok(false);
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        // Closing `file` releases the probe lock if we got it.
        let acquired = try_flock_exclusive(&file).map_err(|e| lock_error(&path, e))?;
        Ok(!acquired)
    }
}

/// Holds a repository's lock until dropped.
#[derive(Debug)]
pub struct DeployGuard {
    _file: File,
    repository: String,
}

impl DeployGuard {
    pub fn repository(&self) -> &str {
        &self.repository
    }
}

fn lock_error(path: &Path, e: io::Error) -> CoreError {
    CoreError::Io(io::Error::new(
        e.kind(),
        format!("locking {}: {}", path.display(), e),
    ))
}

/// Non-blocking exclusive `flock`. `Ok(false)` means someone else holds it.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;

        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive_per_repository() {
        let temp_dir = TempDir::new().unwrap();
        let locks = DeployLocks::new(temp_dir.path());

        let guard = locks.try_acquire("shop").unwrap().unwrap();
        assert_eq!(guard.repository(), "shop");
        assert!(locks.try_acquire("shop").unwrap().is_none());
        assert!(locks.try_acquire("blog").unwrap().is_some());
        assert!(locks.is_locked("shop").unwrap());

        drop(guard);
        assert!(!locks.is_locked("shop").unwrap());
        assert!(locks.try_acquire("shop").unwrap().is_some());
    }

    #[test]
    fn test_independent_instances_share_the_lock() {
        let temp_dir = TempDir::new().unwrap();
        let server = DeployLocks::new(temp_dir.path());
        let cli = DeployLocks::new(temp_dir.path());

        let guard = server.try_acquire("shop").unwrap().unwrap();
        assert!(cli.try_acquire("shop").unwrap().is_none());
        assert!(cli.is_locked("shop").unwrap());

        drop(guard);
        let guard = cli.try_acquire("shop").unwrap().unwrap();
        assert!(server.try_acquire("shop").unwrap().is_none());
        drop(guard);
    }

    #[test]
    fn test_lock_dir_created_and_names_sanitized() {
        let temp_dir = TempDir::new().unwrap();
        let locks = DeployLocks::new(temp_dir.path().join("run").join("locks"));

        let _guard = locks.try_acquire("acme/shop").unwrap().unwrap();
        assert!(locks.lock_dir().is_dir());
        assert_eq!(
            locks.lock_path("acme/shop"),
            temp_dir.path().join("run").join("locks").join("acme_shop.lock")
        );
        assert!(locks.lock_path("acme/shop").exists());
    }

    #[test]
    fn test_unknown_repository_not_locked() {
        let temp_dir = TempDir::new().unwrap();
        let locks = DeployLocks::new(temp_dir.path());
        assert!(!locks.is_locked("ghost").unwrap());
    }
}
