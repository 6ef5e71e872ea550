//! CLI command implementations.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use ado2gh_migrate::{
    load_plan, AdoClient, BatchRunner, GitHubClient, MigrationOrchestrator, MigrationSettings,
    MigrationUnit, RateLimiter, SourcePlatform, TargetPlatform,
};

pub type Result<T> = anyhow::Result<T>;

pub struct MigrateArgs {
    pub project: String,
    pub repo: String,
    pub target_name: Option<String>,
    pub dry_run: bool,
    pub no_git: bool,
    pub no_pipelines: bool,
    pub no_issues: bool,
    pub verify_remote: bool,
}

fn load_settings(config: &Path) -> Result<MigrationSettings> {
    MigrationSettings::load(config)
        .with_context(|| format!("could not load configuration from {}", config.display()))
}

fn source_client(settings: &MigrationSettings) -> Result<AdoClient> {
    AdoClient::new(
        &settings.azure_devops.organization,
        &settings.azure_devops.personal_access_token,
        RateLimiter::new(settings.rates.max_calls_per_second),
        Duration::from_secs(30),
    )
    .context("could not construct the Azure DevOps client")
}

/// Migrate a single repository.
pub async fn migrate(config: &Path, args: MigrateArgs) -> Result<()> {
    let mut settings = load_settings(config)?;
    if args.verify_remote {
        settings.git.verify_remote = true;
    }

    let mut unit = MigrationUnit::new(args.project, args.repo);
    unit.target_repo_name = args.target_name;
    unit.migrate_git = !args.no_git;
    unit.migrate_pipelines = !args.no_pipelines;
    unit.migrate_issues = !args.no_issues;
    unit.pipeline_scope = settings.pipelines.scope;

    tracing::info!(project = %unit.project, repo = %unit.repo, dry_run = args.dry_run, "starting migration");
    let orchestrator = MigrationOrchestrator::from_settings(&settings, args.dry_run)?;
    let report = orchestrator.run_unit(&unit).await;
    println!("{}", report.summary());

    if !report.success {
        bail!("migration of {}/{} failed", report.project, report.repo);
    }
    Ok(())
}

/// Migrate every unit in a plan file.
pub async fn batch(config: &Path, plan_path: &Path, dry_run: bool) -> Result<()> {
    let settings = load_settings(config)?;
    let plan = load_plan(plan_path)
        .with_context(|| format!("could not load plan from {}", plan_path.display()))?;
    tracing::info!(units = plan.len(), path = %plan_path.display(), "loaded migration plan");

    let orchestrator = MigrationOrchestrator::from_settings(&settings, dry_run)?;
    let reports = BatchRunner::new(&orchestrator).run(&plan).await;

    for report in &reports {
        println!("{}", report.summary());
    }

    let failed = reports.iter().filter(|r| !r.success).count();
    println!(
        "Batch complete: {} succeeded, {} failed",
        reports.len() - failed,
        failed
    );
    if failed > 0 {
        bail!("{failed} unit(s) did not migrate successfully");
    }
    Ok(())
}

/// List source projects.
pub async fn projects(config: &Path) -> Result<()> {
    let settings = load_settings(config)?;
    let client = source_client(&settings)?;

    let projects = client.list_projects().await?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    for project in projects {
        println!("{}", project.name);
    }
    Ok(())
}

/// List repositories in a source project.
pub async fn repos(config: &Path, project: &str) -> Result<()> {
    let settings = load_settings(config)?;
    let client = source_client(&settings)?;

    let repos = client.list_repositories(project).await?;
    if repos.is_empty() {
        println!("No repositories found in {project}.");
        return Ok(());
    }
    for repo in repos {
        let branch = repo.default_branch.as_deref().unwrap_or("-");
        println!("{:<40} default branch: {branch}", repo.name);
    }
    Ok(())
}

/// Check credentials and local tooling.
pub async fn doctor(config: &Path) -> Result<()> {
    let mut failures = 0;

    match std::process::Command::new("git").arg("--version").output() {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout);
            println!("ok: {}", version.trim());
        }
        _ => {
            println!("FAIL: git binary not found on PATH");
            failures += 1;
        }
    }

    let settings = load_settings(config)?;
    println!("ok: configuration loaded from {}", config.display());

    let source = source_client(&settings)?;
    match source.validate_credentials().await {
        Ok(()) => println!(
            "ok: Azure DevOps credentials valid for organization '{}'",
            settings.azure_devops.organization
        ),
        Err(e) => {
            println!("FAIL: Azure DevOps credentials: {e}");
            failures += 1;
        }
    }

    let target = GitHubClient::new(
        &settings.github.token,
        settings.github.organization.clone(),
        RateLimiter::new(settings.rates.max_calls_per_second),
        Duration::from_secs(30),
    )?;
    match target.validate_credentials().await {
        Ok(()) => match &settings.github.organization {
            Some(org) => println!("ok: GitHub credentials valid, organization '{org}' reachable"),
            None => println!("ok: GitHub credentials valid (personal account)"),
        },
        Err(e) => {
            println!("FAIL: GitHub credentials: {e}");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} check(s) failed");
    }
    println!("All checks passed.");
    Ok(())
}
