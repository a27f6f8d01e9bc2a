//! List command - Show registered repositories.

use anyhow::{Context, Result};

use deployhook_core::{DeployhookConfig, GitOps, JsonRegistry, RepositoryRecord};

const SHORT_HASH: usize = 8;

pub async fn execute(config: &DeployhookConfig) -> Result<()> {
    let registry = JsonRegistry::load(&config.registry_path)
        .context("Failed to load repository registry")?;

    if registry.is_empty() {
        println!("No repositories registered. Add one with `deployhook install`.");
        return Ok(());
    }

    println!(
        "{:<20} {:<40} {:<12} {:<22} {:<10} {}",
        "NAME", "PATH", "BRANCH", "TYPE", "COMMIT", "CREATED"
    );
    for record in registry.iter() {
        println!(
            "{:<20} {:<40} {:<12} {:<22} {:<10} {}",
            record.name,
            record.local_path.display(),
            record.branch,
            record.profile_type,
            deployed_commit(record),
            record.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("{} repositories", registry.len());

    Ok(())
}

/// Short hash of the working tree's HEAD, or `-` when it cannot be read.
fn deployed_commit(record: &RepositoryRecord) -> String {
    match GitOps::new(&record.local_path).current_commit() {
        Ok(hash) => hash.chars().take(SHORT_HASH).collect(),
        Err(_) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deployed_commit_without_repository() {
        let temp_dir = TempDir::new().unwrap();
        let record = RepositoryRecord::new("shop", "git@x:shop.git", temp_dir.path(), "main", "simple", "t");

        assert_eq!(deployed_commit(&record), "-");
    }

    #[test]
    fn test_deployed_commit_is_short_head() {
        if !GitOps::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        for args in [
            vec!["init"],
            vec![
                "-c",
                "user.name=deployhook",
                "-c",
                "user.email=deployhook@localhost",
                "commit",
                "--allow-empty",
                "-m",
                "initial",
            ],
        ] {
            let status = std::process::Command::new("git")
                .args(&args)
                .current_dir(temp_dir.path())
                .status()
                .unwrap();
            assert!(status.success());
        }
        let record = RepositoryRecord::new("shop", "git@x:shop.git", temp_dir.path(), "main", "simple", "t");

        let head = GitOps::new(temp_dir.path()).current_commit().unwrap();
        assert_eq!(deployed_commit(&record), head[..SHORT_HASH]);
    }
}
