//! Integration tests for admission and the deployment pipeline.
//!
//! Every scenario drives the real profiles through a scripted `MockRunner`.

use std::fs;
use std::sync::Arc;

use deployhook_core::{
    evaluate, Decision, Deployer, DeploymentExecutor, MemoryLogger, ProfileType, RollbackKind,
    RollbackStatus, RepositoryRecord, WebhookEvent, ANCHOR_RESET,
};
use deployhook_runner::{MockResponse, MockRunner};
use tempfile::{tempdir, TempDir};

const ANCHOR: &str = "9f2c1e7b5a3d4c6e8f0a1b2c3d4e5f6a7b8c9d0e";
const MIGRATE: &str = "doctrine:migrations:migrate --no-interaction";

fn repository(dir: &TempDir, profile_type: &str) -> RepositoryRecord {
    RepositoryRecord::new(
        "shop",
        "git@gitlab.com:acme/shop.git",
        dir.path(),
        "main",
        profile_type,
        "f3a9c2e1",
    )
}

fn runner() -> MockRunner {
    MockRunner::new().respond_to("git rev-parse HEAD", MockResponse::success(format!("{}\n", ANCHOR)))
}

fn executor(runner: &MockRunner) -> DeploymentExecutor {
    DeploymentExecutor::new(Arc::new(runner.clone()), Arc::new(MemoryLogger::new()))
}

/// symfony-api with a failing migration unwinds dependency_install, then
/// git_pull, then resets to the anchor. cache_clear never runs.
#[tokio::test]
async fn test_symfony_api_migration_failure() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("composer.json"), "{}").unwrap();
    let runner = runner().respond_to(MIGRATE, MockResponse::failure(1, "SQLSTATE[42S01]"));
    let record = repository(&dir, "symfony-api");

    let profile = ProfileType::SymfonyApi.profile();
    let outcome = executor(&runner).execute(&profile, &record).await.unwrap();

    assert!(!outcome.succeeded);
    assert_eq!(outcome.failed_step.as_deref(), Some("schema_migrate"));

    let steps: Vec<_> = outcome
        .step_results
        .iter()
        .map(|r| (r.step_name.as_str(), r.succeeded))
        .collect();
    assert_eq!(
        steps,
        vec![
            ("git_pull", true),
            ("dependency_install", true),
            ("schema_migrate", false)
        ]
    );
    assert!(outcome.step("cache_clear").is_none());
    assert!(!runner.was_called("cache:clear"));

    let rollback = outcome.rollback_results.as_ref().unwrap();
    let names: Vec<_> = rollback.iter().map(|r| r.step_name.as_str()).collect();
    assert_eq!(names, vec!["dependency_install", "git_pull", ANCHOR_RESET]);
    assert_eq!(rollback[2].kind, RollbackKind::AnchorReset);
    assert_eq!(outcome.rollback_status(), RollbackStatus::Complete);

    let reset = format!("git reset --hard {}", ANCHOR);
    assert_eq!(
        runner.commands(),
        vec![
            "git rev-parse HEAD",
            "git pull origin main",
            "composer install --no-dev --optimize-autoloader",
            "php bin/console doctrine:migrations:migrate --no-interaction",
            "composer install --no-dev --optimize-autoloader",
            reset.as_str(),
            reset.as_str(),
        ]
    );
}

/// Every command runs with the working directory pinned to the repository.
#[tokio::test]
async fn test_commands_run_in_local_path() {
    let dir = tempdir().unwrap();
    let runner = runner();
    let record = repository(&dir, "symfony-asset-mapper");

    let outcome = executor(&runner)
        .execute(&ProfileType::SymfonyAssetMapper.profile(), &record)
        .await
        .unwrap();

    assert!(outcome.succeeded);
    assert!(runner
        .get_calls()
        .iter()
        .all(|call| call.working_directory == dir.path()));
}

/// When the first step fails the stack is empty, yet the anchor reset runs.
#[tokio::test]
async fn test_first_step_failure_resets_to_anchor() {
    let dir = tempdir().unwrap();
    let runner = runner().respond_to("git pull", MockResponse::failure(1, "Could not resolve host"));
    let record = repository(&dir, "symfony-webpack");

    let outcome = executor(&runner)
        .execute(&ProfileType::SymfonyWebpack.profile(), &record)
        .await
        .unwrap();

    assert_eq!(outcome.failed_step.as_deref(), Some("git_pull"));
    assert_eq!(outcome.step_results.len(), 1);
    assert!(outcome.rollback_plan.is_empty());

    let rollback = outcome.rollback_results.unwrap();
    assert_eq!(rollback.len(), 1);
    assert_eq!(rollback[0].step_name, ANCHOR_RESET);
    assert!(rollback[0].succeeded);
    assert_eq!(
        runner.commands().last().unwrap(),
        &format!("git reset --hard {}", ANCHOR)
    );
}

/// For step k failing, results exist for steps 1..k and the stack holds the
/// compensations of steps 1..k-1, in application order.
#[tokio::test]
async fn test_stack_holds_successful_prefix() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("composer.json"), "{}").unwrap();
    fs::write(dir.path().join("package.json"), "{}").unwrap();
    let runner = runner().respond_to("npm run build", MockResponse::failure(2, "webpack error"));
    let record = repository(&dir, "symfony-webpack");

    let outcome = executor(&runner)
        .execute(&ProfileType::SymfonyWebpack.profile(), &record)
        .await
        .unwrap();

    assert_eq!(outcome.step_results.len(), 4);
    assert_eq!(outcome.failed_step.as_deref(), Some("frontend_build"));
    let plan: Vec<_> = outcome
        .rollback_plan
        .iter()
        .map(|e| e.step_name.as_str())
        .collect();
    assert_eq!(plan, vec!["git_pull", "dependency_install", "frontend_install"]);

    let rollback: Vec<_> = outcome
        .rollback_results
        .unwrap()
        .into_iter()
        .map(|r| r.step_name)
        .collect();
    assert_eq!(
        rollback,
        vec!["frontend_install", "dependency_install", "git_pull", ANCHOR_RESET]
    );
}

/// Manifest-conditioned steps are successful no-ops when the manifest is absent.
#[tokio::test]
async fn test_missing_manifests_skip_install_steps() {
    let dir = tempdir().unwrap();
    let runner = runner();
    let record = repository(&dir, "symfony-webpack");

    let outcome = executor(&runner)
        .execute(&ProfileType::SymfonyWebpack.profile(), &record)
        .await
        .unwrap();

    assert!(outcome.succeeded);
    let install = outcome.step("dependency_install").unwrap();
    assert!(install.succeeded);
    assert!(install.skipped);
    assert_eq!(install.output, "No composer.json found");
    assert!(outcome.step("frontend_install").unwrap().skipped);
    assert!(!outcome.step("frontend_build").unwrap().skipped);
    assert!(!runner.was_called("composer"));
    assert!(!runner.was_called("npm ci"));
    assert!(runner.was_called("npm run build"));
}

/// Running `simple` twice on an up-to-date tree gives equivalent outcomes.
#[tokio::test]
async fn test_simple_profile_idempotent() {
    let dir = tempdir().unwrap();
    let runner = runner().respond_to("git pull", MockResponse::success("Already up to date."));
    let record = repository(&dir, "simple");
    let executor = executor(&runner);
    let profile = ProfileType::Simple.profile();

    let first = executor.execute(&profile, &record).await.unwrap();
    let second = executor.execute(&profile, &record).await.unwrap();

    assert!(first.succeeded && second.succeeded);
    assert_eq!(first.step_results, second.step_results);
    assert_eq!(first.pre_deploy_commit, second.pre_deploy_commit);
    assert_eq!(first.step_results[0].output, "Already up to date.");
    assert_eq!(runner.call_count(), 4);
}

/// A failing anchor reset is reported distinctly from a failed compensation.
#[tokio::test]
async fn test_anchor_reset_failure_is_distinct() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("composer.json"), "{}").unwrap();
    let record = repository(&dir, "symfony-api");
    let profile = ProfileType::SymfonyApi.profile();

    let reset_succeeds = runner()
        .respond_to(MIGRATE, MockResponse::failure(1, "migration failed"))
        .respond_to("composer install", MockResponse::success(""))
        .respond_to("git reset", MockResponse::success("HEAD is now at 9f2c1e7"));
    let outcome = executor(&reset_succeeds)
        .execute(&profile, &record)
        .await
        .unwrap();
    assert_eq!(outcome.rollback_status(), RollbackStatus::Complete);

    let reset_fails = runner()
        .respond_to(MIGRATE, MockResponse::failure(1, "migration failed"))
        .respond_to("git reset", MockResponse::failure(128, "index.lock exists"));
    let outcome = executor(&reset_fails).execute(&profile, &record).await.unwrap();
    let rollback = outcome.rollback_results.as_ref().unwrap();

    assert_eq!(rollback.len(), 3);
    assert!(rollback[0].succeeded);
    assert!(!rollback[2].succeeded);
    assert_eq!(rollback[2].output, "index.lock exists");
    assert_eq!(outcome.rollback_status(), RollbackStatus::AnchorResetFailed);
}

/// A push for another branch is ignored without running anything.
#[tokio::test]
async fn test_push_for_other_branch_is_ignored() {
    let dir = tempdir().unwrap();
    let record = repository(&dir, "symfony-api");
    let runner = runner();
    let deployer = Deployer::new(Arc::new(runner.clone()), Arc::new(MemoryLogger::new()));

    let event = WebhookEvent::from_gitlab(
        Some(record.webhook_token.clone()),
        Some("Push Hook"),
        br#"{"ref": "refs/heads/develop"}"#,
    )
    .unwrap();
    let decision = evaluate(&event, &[record.clone()]);

    assert_eq!(decision.message().as_deref(), Some("Branch develop ignored"));
    if let Decision::Deploy(record) = decision {
        deployer.deploy(&record).await.unwrap();
    }
    assert_eq!(runner.call_count(), 0);
}
