//! Git helpers for managing tracked working trees.
//!
//! Used by the management CLI (cloning on install, showing the deployed
//! commit). The deployment pipeline itself goes through the command runner.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{CoreError, CoreResult};

/// Git operations on one working tree.
#[derive(Debug)]
pub struct GitOps {
    repo_path: PathBuf,
}

impl GitOps {
    /// Create a new Git operations manager for a repository.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    /// Check if Git is available on the system.
    pub fn is_git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Clone `url` at `branch` into `path`.
    ///
    /// Refuses to touch an existing directory.
    pub fn clone_repository<P: AsRef<Path>>(url: &str, path: P, branch: &str) -> CoreResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(CoreError::GitError(format!(
                "Directory {} already exists",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Cloning {} ({}) into {}", url, branch, path.display());

        let output = Command::new("git")
            .args(["clone", "-b", branch, url])
            .arg(path)
            .output()
            .map_err(|e| CoreError::GitError(format!("Failed to run git clone: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::GitError(format!("git clone failed: {}", stderr.trim())));
        }

        Ok(Self::new(path))
    }

    /// Hash of the commit HEAD points at.
    pub fn current_commit(&self) -> CoreResult<String> {
        let hash = self.git(&["rev-parse", "HEAD"])?;
        if hash.is_empty() {
            return Err(CoreError::GitError("No commit found".to_string()));
        }
        Ok(hash)
    }

    /// Run git in the working tree and return its trimmed stdout.
    fn git(&self, args: &[&str]) -> CoreResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| CoreError::GitError(format!("Failed to run git {}: {}", args[0], e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::GitError(format!(
                "git {} failed: {}",
                args[0],
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_git(path: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(["-c", "user.name=deployhook", "-c", "user.email=deployhook@localhost"])
            .args(args)
            .current_dir(path)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn init_with_commit(path: &Path) {
        run_git(path, &["init"]);
        run_git(path, &["commit", "--allow-empty", "-m", "initial"]);
    }

    #[test]
    fn test_current_commit() {
        if !GitOps::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        init_with_commit(temp_dir.path());

        let hash = GitOps::new(temp_dir.path()).current_commit().unwrap();
        assert_eq!(hash.len(), 40);
        assert_eq!(hash, run_git(temp_dir.path(), &["rev-parse", "HEAD"]));
    }

    #[test]
    fn test_current_commit_without_commits() {
        if !GitOps::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        run_git(temp_dir.path(), &["init"]);

        assert!(GitOps::new(temp_dir.path()).current_commit().is_err());
    }

    #[test]
    fn test_clone_repository() {
        if !GitOps::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("origin");
        std::fs::create_dir(&origin).unwrap();
        init_with_commit(&origin);
        let branch = run_git(&origin, &["symbolic-ref", "--short", "HEAD"]);

        let target = temp_dir.path().join("deploy").join("shop");
        let cloned =
            GitOps::clone_repository(origin.to_str().unwrap(), &target, &branch).unwrap();

        assert_eq!(cloned.path(), target.as_path());
        assert_eq!(
            cloned.current_commit().unwrap(),
            GitOps::new(&origin).current_commit().unwrap()
        );
    }

    #[test]
    fn test_clone_refuses_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = GitOps::clone_repository("https://example.invalid/shop.git", temp_dir.path(), "main");
        assert!(matches!(result, Err(CoreError::GitError(_))));
    }
}
