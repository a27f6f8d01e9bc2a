//! Deployment profiles.
//!
//! A profile is the fixed, ordered list of steps run for one kind of project.
//! Steps carry action descriptors rather than code, so a profile can be
//! listed, serialized and compared without running anything.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const COMPOSER_INSTALL: &str = "composer install --no-dev --optimize-autoloader";
const NPM_CI: &str = "npm ci";
const NPM_BUILD: &str = "npm run build";
const ASSET_MAP_COMPILE: &str = "php bin/console asset-map:compile";
const MIGRATE: &str = "php bin/console doctrine:migrations:migrate --no-interaction";
const MIGRATE_PREV: &str = "php bin/console doctrine:migrations:migrate prev --no-interaction";
const CACHE_CLEAR: &str = "php bin/console cache:clear --env=prod";

/// Known project types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileType {
    Simple,
    SymfonyApi,
    SymfonyWebpack,
    SymfonyAssetMapper,
}

impl ProfileType {
    pub const ALL: [ProfileType; 4] = [
        ProfileType::SymfonyWebpack,
        ProfileType::SymfonyAssetMapper,
        ProfileType::SymfonyApi,
        ProfileType::Simple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::SymfonyApi => "symfony-api",
            Self::SymfonyWebpack => "symfony-webpack",
            Self::SymfonyAssetMapper => "symfony-asset-mapper",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Simple => "Git pull only",
            Self::SymfonyApi => "Symfony API without frontend assets",
            Self::SymfonyWebpack => "Symfony with Webpack Encore",
            Self::SymfonyAssetMapper => "Symfony with AssetMapper",
        }
    }

    /// Ordered steps of this profile.
    pub fn profile(&self) -> DeploymentProfile {
        let steps = match self {
            Self::Simple => vec![StepSpec::git_pull()],
            Self::SymfonyApi => vec![
                StepSpec::git_pull(),
                StepSpec::dependency_install(),
                StepSpec::schema_migrate(),
                StepSpec::cache_clear(),
            ],
            Self::SymfonyWebpack => vec![
                StepSpec::git_pull(),
                StepSpec::dependency_install(),
                StepSpec::frontend_install(),
                StepSpec::frontend_build(),
                StepSpec::schema_migrate(),
                StepSpec::cache_clear(),
            ],
            Self::SymfonyAssetMapper => vec![
                StepSpec::git_pull(),
                StepSpec::dependency_install(),
                StepSpec::asset_compile(),
                StepSpec::schema_migrate(),
                StepSpec::cache_clear(),
            ],
        };

        DeploymentProfile {
            profile_type: *self,
            steps,
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::UnknownProfile(s.to_string()))
    }
}

/// Commit a reset action returns the working tree to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTarget {
    /// HEAD as captured before the first step ran
    PreDeployCommit,
}

/// What a step (or its compensation) does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Run a shell command in the working tree
    Command { command: String },
    /// Run a shell command only if `manifest` exists in the working tree
    CommandIfPresent { manifest: String, command: String },
    /// Pull the repository's configured branch from `origin`
    GitPull,
    /// Hard-reset the working tree
    GitReset { target: ResetTarget },
}

impl Action {
    pub fn command(command: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
        }
    }

    pub fn command_if_present(manifest: impl Into<String>, command: impl Into<String>) -> Self {
        Self::CommandIfPresent {
            manifest: manifest.into(),
            command: command.into(),
        }
    }

    pub fn reset_to_anchor() -> Self {
        Self::GitReset {
            target: ResetTarget::PreDeployCommit,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command { command } => write!(f, "{}", command),
            Self::CommandIfPresent { manifest, command } => {
                write!(f, "{} (if {} exists)", command, manifest)
            }
            Self::GitPull => write!(f, "git pull origin <branch>"),
            Self::GitReset { .. } => write!(f, "git reset --hard <pre-deploy commit>"),
        }
    }
}

/// One step of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub forward: Action,
    pub compensation: Option<Action>,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, forward: Action) -> Self {
        Self {
            name: name.into(),
            forward,
            compensation: None,
        }
    }

    pub fn with_compensation(mut self, compensation: Action) -> Self {
        self.compensation = Some(compensation);
        self
    }

    /// Step whose compensation re-runs its forward action.
    fn self_compensating(name: &str, action: Action) -> Self {
        Self::new(name, action.clone()).with_compensation(action)
    }

    pub fn git_pull() -> Self {
        Self::new("git_pull", Action::GitPull).with_compensation(Action::reset_to_anchor())
    }

    pub fn dependency_install() -> Self {
        Self::self_compensating(
            "dependency_install",
            Action::command_if_present("composer.json", COMPOSER_INSTALL),
        )
    }

    pub fn frontend_install() -> Self {
        Self::self_compensating(
            "frontend_install",
            Action::command_if_present("package.json", NPM_CI),
        )
    }

    pub fn frontend_build() -> Self {
        Self::self_compensating("frontend_build", Action::command(NPM_BUILD))
    }

    pub fn asset_compile() -> Self {
        Self::self_compensating("asset_compile", Action::command(ASSET_MAP_COMPILE))
    }

    pub fn schema_migrate() -> Self {
        Self::new("schema_migrate", Action::command(MIGRATE))
            .with_compensation(Action::command(MIGRATE_PREV))
    }

    pub fn cache_clear() -> Self {
        Self::self_compensating("cache_clear", Action::command(CACHE_CLEAR))
    }
}

/// Ordered step sequence for one project type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentProfile {
    pub profile_type: ProfileType,
    pub steps: Vec<StepSpec>,
}

impl DeploymentProfile {
    /// Build a profile from explicit steps.
    pub fn custom(profile_type: ProfileType, steps: Vec<StepSpec>) -> Self {
        Self {
            profile_type,
            steps,
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Resolve a project type string to its profile.
///
/// Unknown types are an error; there is no fallback profile.
pub fn resolve(profile_type: &str) -> CoreResult<DeploymentProfile> {
    Ok(profile_type.parse::<ProfileType>()?.profile())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_step_order() {
        assert_eq!(resolve("simple").unwrap().step_names(), vec!["git_pull"]);
        assert_eq!(
            resolve("symfony-api").unwrap().step_names(),
            vec!["git_pull", "dependency_install", "schema_migrate", "cache_clear"]
        );
        assert_eq!(
            resolve("symfony-webpack").unwrap().step_names(),
            vec![
                "git_pull",
                "dependency_install",
                "frontend_install",
                "frontend_build",
                "schema_migrate",
                "cache_clear"
            ]
        );
        assert_eq!(
            resolve("symfony-asset-mapper").unwrap().step_names(),
            vec![
                "git_pull",
                "dependency_install",
                "asset_compile",
                "schema_migrate",
                "cache_clear"
            ]
        );
    }

    #[test]
    fn test_unknown_profile() {
        let err = resolve("laravel").unwrap_err();
        assert!(matches!(err, CoreError::UnknownProfile(ref t) if t == "laravel"));
        assert_eq!(err.to_string(), "Unknown deployment type: laravel");
        assert!(resolve("Simple").is_err());
        assert!(resolve("").is_err());
    }

    #[test]
    fn test_profile_type_round_trip_names() {
        for profile_type in ProfileType::ALL {
            assert_eq!(profile_type.as_str().parse::<ProfileType>().unwrap(), profile_type);
            let json = serde_json::to_string(&profile_type).unwrap();
            assert_eq!(json, format!("\"{}\"", profile_type.as_str()));
        }
    }

    #[test]
    fn test_compensations() {
        let profile = resolve("symfony-api").unwrap();
        assert_eq!(profile.steps[0].compensation, Some(Action::reset_to_anchor()));
        assert_eq!(profile.steps[1].compensation.as_ref(), Some(&profile.steps[1].forward));
        assert_eq!(
            profile.steps[2].compensation,
            Some(Action::command(MIGRATE_PREV))
        );
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_value(Action::command_if_present("package.json", "npm ci")).unwrap();
        assert_eq!(json["action"], "command_if_present");
        assert_eq!(json["manifest"], "package.json");

        let json = serde_json::to_value(Action::reset_to_anchor()).unwrap();
        assert_eq!(json["action"], "git_reset");
        assert_eq!(json["target"], "pre_deploy_commit");
    }
}
