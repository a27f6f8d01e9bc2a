//! Repository registry.
//!
//! Tracked repositories are stored as a pretty-printed JSON object keyed by
//! repository name. The deployment core only ever reads it through
//! [`RepositoryStore`]; mutation is reserved for the management CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

static GIT_URL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([^/]+)\.git$").expect("static regex")
});

/// A tracked repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryRecord {
    /// Unique name (registry key)
    pub name: String,
    /// Clone URL
    pub git_url: String,
    /// Working tree the deployment runs in
    pub local_path: PathBuf,
    /// Branch whose pushes/merges trigger a deployment
    pub branch: String,
    /// Deployment profile type (e.g. "symfony-api")
    #[serde(rename = "type")]
    pub profile_type: String,
    /// Shared secret expected in the webhook token header
    pub webhook_token: String,
    /// When the repository was registered
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
}

/// Registries written by earlier installs store local time without an offset.
const LEGACY_CREATED_AT: &str = "%Y-%m-%d %H:%M:%S";

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(&raw, LEGACY_CREATED_AT)
        .map_err(|e| serde::de::Error::custom(format!("invalid created_at {:?}: {}", raw, e)))?;
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc()))
}

impl RepositoryRecord {
    pub fn new(
        name: impl Into<String>,
        git_url: impl Into<String>,
        local_path: impl Into<PathBuf>,
        branch: impl Into<String>,
        profile_type: impl Into<String>,
        webhook_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            git_url: git_url.into(),
            local_path: local_path.into(),
            branch: branch.into(),
            profile_type: profile_type.into(),
            webhook_token: webhook_token.into(),
            created_at: Utc::now(),
        }
    }
}

/// Derive a repository name from its clone URL.
///
/// `git@host:group/shop.git` → `shop`. Falls back to the last component of
/// `local_path` when the URL does not end in `<name>.git`.
pub fn project_name(git_url: &str, local_path: &Path) -> Option<String> {
    if let Some(captures) = GIT_URL_NAME.captures(git_url) {
        return Some(captures[1].to_string());
    }
    if let Some((_, tail)) = git_url.rsplit_once(':') {
        if let Some(name) = tail.strip_suffix(".git").filter(|n| !n.contains('/')) {
            return Some(name.to_string());
        }
    }
    local_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

/// Read-only access to tracked repositories.
pub trait RepositoryStore: Send + Sync {
    /// Get a repository by name.
    fn get(&self, name: &str) -> CoreResult<Option<RepositoryRecord>>;

    /// Get every tracked repository.
    fn all(&self) -> CoreResult<Vec<RepositoryRecord>>;
}

/// Editable, in-memory view of a registry file.
#[derive(Debug, Clone, Default)]
pub struct JsonRegistry {
    path: PathBuf,
    repositories: BTreeMap<String, RepositoryRecord>,
}

impl JsonRegistry {
    /// Create an empty registry backed by `path` (nothing is read).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            repositories: BTreeMap::new(),
        }
    }

    /// Load a registry from disk. A missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("Registry {:?} does not exist yet", path);
            return Ok(Self::new(path));
        }

        let content = fs::read_to_string(&path)?;
        let repositories = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content).map_err(|e| {
                CoreError::Serialization(format!("{}: {}", path.display(), e))
            })?
        };

        Ok(Self { path, repositories })
    }

    /// Save the registry to disk.
    pub fn save(&self) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.repositories)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(&self.path, json)?;
        debug!("Saved registry to {:?}", self.path);
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a repository without saving.
    pub fn insert(&mut self, record: RepositoryRecord) -> CoreResult<()> {
        if self.repositories.contains_key(&record.name) {
            return Err(CoreError::RepositoryExists(record.name));
        }
        self.repositories.insert(record.name.clone(), record);
        Ok(())
    }

    /// Insert a repository and save.
    pub fn add(&mut self, record: RepositoryRecord) -> CoreResult<()> {
        self.insert(record)?;
        self.save()
    }

    /// Remove a repository and save, returning the removed record.
    pub fn remove(&mut self, name: &str) -> CoreResult<RepositoryRecord> {
        let record = self
            .repositories
            .remove(name)
            .ok_or_else(|| CoreError::RepositoryNotFound(name.to_string()))?;
        self.save()?;
        Ok(record)
    }

    /// Check if a repository is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.repositories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Iterate over records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &RepositoryRecord> {
        self.repositories.values()
    }
}

impl RepositoryStore for JsonRegistry {
    fn get(&self, name: &str) -> CoreResult<Option<RepositoryRecord>> {
        Ok(self.repositories.get(name).cloned())
    }

    fn all(&self) -> CoreResult<Vec<RepositoryRecord>> {
        Ok(self.repositories.values().cloned().collect())
    }
}

/// Registry file that is re-read on every access.
///
/// Used by the long-running server so registrations made with the CLI are
/// picked up without a restart.
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RepositoryStore for RegistryFile {
    fn get(&self, name: &str) -> CoreResult<Option<RepositoryRecord>> {
        JsonRegistry::load(&self.path)?.get(name)
    }

    fn all(&self) -> CoreResult<Vec<RepositoryRecord>> {
        JsonRegistry::load(&self.path)?.all()
    }
}
