//! Per-unit migration sequencing.
//!
//! One [`MigrationOrchestrator::run_unit`] call drives a single repository
//! through validation, git transfer, pipeline conversion, and issue
//! migration, and always produces exactly one [`MigrationReport`]. Stage
//! failures are captured into the report; they never propagate out.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ado::AdoClient;
use crate::client::{SourcePlatform, TargetPlatform};
use crate::config::MigrationSettings;
use crate::error::{MigrationError, Result};
use crate::git::{redact, GitTransferEngine};
use crate::github::GitHubClient;
use crate::pipeline::PipelineTranslator;
use crate::ratelimit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::types::{MigrationReport, MigrationUnit, RepoRef, RepositorySnapshot, StageStatus};
use crate::workitem::WorkItemTranslator;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// States a unit passes through. FAILED is reachable only from VALIDATING;
/// later stage failures are recorded on the report instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Validating,
    GitTransfer,
    PipelineConvert,
    IssueMigrate,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::GitTransfer => "git_transfer",
            Self::PipelineConvert => "pipeline_convert",
            Self::IssueMigrate => "issue_migrate",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Run-wide behavior knobs, mostly derived from configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Suppress issue migration globally, regardless of unit flags.
    pub skip_issues: bool,
    pub exclude_disabled_pipelines: bool,
    /// Compare branch heads on the target after a push.
    pub verify_remote: bool,
    pub create_private_repos: bool,
    /// Where to persist report JSON; `None` disables persistence.
    pub output_directory: Option<PathBuf>,
}

struct ValidatedUnit {
    source_repo: RepoRef,
    target_name: String,
}

/// Sequences one migration unit through its stages.
pub struct MigrationOrchestrator {
    source: Arc<dyn SourcePlatform>,
    target: Arc<dyn TargetPlatform>,
    git: GitTransferEngine,
    pipelines: PipelineTranslator,
    work_items: WorkItemTranslator,
    retry: RetryPolicy,
    options: RunOptions,
}

impl MigrationOrchestrator {
    pub fn new(
        source: Arc<dyn SourcePlatform>,
        target: Arc<dyn TargetPlatform>,
        git: GitTransferEngine,
        work_items: WorkItemTranslator,
        retry: RetryPolicy,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            target,
            git,
            pipelines: PipelineTranslator::new(),
            work_items,
            retry,
            options,
        }
    }

    /// Construct real platform clients from configuration.
    pub fn from_settings(settings: &MigrationSettings, dry_run: bool) -> Result<Self> {
        let source = AdoClient::new(
            &settings.azure_devops.organization,
            &settings.azure_devops.personal_access_token,
            RateLimiter::new(settings.rates.max_calls_per_second),
            HTTP_TIMEOUT,
        )?;
        let target = GitHubClient::new(
            &settings.github.token,
            settings.github.organization.clone(),
            RateLimiter::new(settings.rates.max_calls_per_second),
            HTTP_TIMEOUT,
        )?;
        let options = RunOptions {
            dry_run,
            skip_issues: settings.skip_issues,
            exclude_disabled_pipelines: settings.pipelines.exclude_disabled,
            verify_remote: settings.git.verify_remote,
            create_private_repos: settings.github.create_private_repos,
            output_directory: Some(PathBuf::from(&settings.output.output_directory)),
        };
        Ok(Self::new(
            Arc::new(source),
            Arc::new(target),
            GitTransferEngine::new(settings.git_timeout()),
            WorkItemTranslator::new(settings.mappings()),
            settings.retry_policy(),
            options,
        ))
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Migrate one unit. Always returns a finalized report; errors are
    /// captured into it rather than propagated.
    pub async fn run_unit(&self, unit: &MigrationUnit) -> MigrationReport {
        let mut report = MigrationReport::new(unit, self.options.dry_run);
        info!(
            project = %unit.project,
            repo = %unit.repo,
            target = %report.target_repo,
            dry_run = self.options.dry_run,
            "starting migration unit"
        );

        info!(state = %MigrationState::Validating, "entering stage");
        let validated = match self.validate(unit).await {
            Ok(validated) => validated,
            Err(err) => {
                let message = redact(&format!("validation failed: {err}"));
                error!(project = %unit.project, repo = %unit.repo, "{message}");
                report.add_error(message);
                report.complete(&MigrationState::Failed.to_string());
                self.persist(&report);
                return report;
            }
        };

        let snapshot = self.fetch_snapshot(unit, &validated, &mut report).await;

        if unit.migrate_git {
            info!(state = %MigrationState::GitTransfer, "entering stage");
            self.run_git_transfer(unit, &validated, &mut report).await;
        }
        if unit.migrate_pipelines && report.pipeline_convert.status != StageStatus::Failed {
            info!(state = %MigrationState::PipelineConvert, "entering stage");
            self.run_pipeline_convert(unit, &validated, &snapshot, &mut report)
                .await;
        }
        if unit.migrate_issues
            && !self.options.skip_issues
            && report.issue_migrate.status != StageStatus::Failed
        {
            info!(state = %MigrationState::IssueMigrate, "entering stage");
            self.run_issue_migrate(&validated, &snapshot, &mut report).await;
        } else if unit.migrate_issues && self.options.skip_issues {
            report
                .issue_migrate
                .skipped_with("suppressed by configuration (skip_issues)");
        }

        info!(state = %MigrationState::Reporting, "entering stage");
        report.complete(&MigrationState::Done.to_string());
        self.persist(&report);
        info!(
            project = %unit.project,
            repo = %unit.repo,
            success = report.success,
            "migration unit finished"
        );
        report
    }

    /// Confirm the source repository exists and resolve the target
    /// repository, creating it when absent (reusing it when present, so
    /// re-runs are not an error). Failures here are unit-fatal.
    async fn validate(&self, unit: &MigrationUnit) -> Result<ValidatedUnit> {
        let repos = self
            .retry
            .run("list source repositories", || {
                let source = &self.source;
                let project = unit.project.as_str();
                async move { source.list_repositories(project).await }
            })
            .await?;

        let source_repo = repos
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(&unit.repo))
            .ok_or_else(|| {
                MigrationError::NotFound(format!(
                    "repository '{}' not found in project '{}'",
                    unit.repo, unit.project
                ))
            })?;

        let target_name = unit.target_name();
        let existing = self
            .retry
            .run("look up target repository", || {
                let target = &self.target;
                let name = target_name.as_str();
                async move { target.get_repository(name).await }
            })
            .await?;

        match existing {
            Some(_) => {
                info!(target = %target_name, "target repository exists, reusing");
            }
            None if self.options.dry_run => {
                info!(target = %target_name, "dry run, would create target repository");
            }
            None => {
                self.retry
                    .run("create target repository", || {
                        let target = &self.target;
                        let name = target_name.as_str();
                        let description = source_repo.description.clone();
                        let private = self.options.create_private_repos;
                        async move {
                            target
                                .create_repository(name, description.as_deref(), private)
                                .await
                        }
                    })
                    .await?;
                info!(target = %target_name, "created target repository");
            }
        }

        Ok(ValidatedUnit {
            source_repo,
            target_name,
        })
    }

    /// Fetch the source-side export bundle once, up front. A listing
    /// failure marks the corresponding stage failed; the other stages are
    /// unaffected.
    async fn fetch_snapshot(
        &self,
        unit: &MigrationUnit,
        validated: &ValidatedUnit,
        report: &mut MigrationReport,
    ) -> RepositorySnapshot {
        let mut snapshot = RepositorySnapshot {
            repository: validated.source_repo.clone(),
            ..Default::default()
        };

        if unit.migrate_pipelines {
            let fetched = self
                .retry
                .run("list pipelines", || {
                    let source = &self.source;
                    let project = unit.project.as_str();
                    let scope = unit.pipeline_scope;
                    let repo_id = validated.source_repo.id.as_str();
                    async move { source.list_pipelines(project, scope, repo_id).await }
                })
                .await;
            match fetched {
                Ok(pipelines) => snapshot.pipelines = pipelines,
                Err(err) => {
                    let message = redact(&format!("pipeline conversion failed: {err}"));
                    report.pipeline_convert.failed(&message);
                    report.add_error(message);
                }
            }
        }

        if unit.migrate_issues && !self.options.skip_issues {
            let fetched = self
                .retry
                .run("list work items", || {
                    let source = &self.source;
                    let project = unit.project.as_str();
                    async move { source.list_work_items(project).await }
                })
                .await;
            match fetched {
                Ok(items) => snapshot.work_items = items,
                Err(err) => {
                    let message = redact(&format!("issue migration failed: {err}"));
                    report.issue_migrate.failed(&message);
                    report.add_error(message);
                }
            }
        }

        snapshot
    }

    async fn run_git_transfer(
        &self,
        unit: &MigrationUnit,
        validated: &ValidatedUnit,
        report: &mut MigrationReport,
    ) {
        report.git_transfer.attempted();

        let urls = async {
            let source_url = self.source.authenticated_clone_url(&validated.source_repo)?;
            let target_url = self
                .target
                .authenticated_clone_url(&validated.target_name)
                .await?;
            Ok::<_, MigrationError>((source_url, target_url))
        }
        .await;

        let (source_url, target_url) = match urls {
            Ok(urls) => urls,
            Err(err) => {
                let message = redact(&format!("git transfer failed: {err}"));
                report.git_transfer.failed(&message);
                report.add_error(message);
                return;
            }
        };

        let transferred = self
            .retry
            .run("git transfer", || {
                let git = &self.git;
                let source_url = source_url.as_str();
                let target_url = target_url.as_str();
                let dry_run = self.options.dry_run;
                async move { git.transfer(source_url, target_url, dry_run).await }
            })
            .await;

        match transferred {
            Ok(stats) => {
                report.branches_migrated = stats.branches;
                report.tags_migrated = stats.tags;
                report.commits_migrated = stats.commits;
                if self.options.dry_run {
                    report
                        .git_transfer
                        .succeeded_with("dry run: cloned and counted, push skipped");
                } else {
                    report.git_transfer.succeeded();
                }
            }
            Err(err) => {
                let message = redact(&format!("git transfer failed: {err}"));
                error!(repo = %unit.repo, "{message}");
                report.git_transfer.failed(&message);
                report.add_error(message);
                return;
            }
        }

        if self.options.verify_remote && !self.options.dry_run {
            match self.git.verify_remote(&source_url, &target_url).await {
                Ok(verification) => {
                    if !verification.matched {
                        report.add_warning(format!(
                            "remote verification: {} branch(es) missing on target: {}",
                            verification.missing_on_remote.len(),
                            verification.missing_on_remote.join(", ")
                        ));
                    }
                    report.remote_verification = Some(verification);
                }
                Err(err) => {
                    report.add_warning(redact(&format!("remote verification failed: {err}")));
                }
            }
        }
    }

    async fn run_pipeline_convert(
        &self,
        unit: &MigrationUnit,
        validated: &ValidatedUnit,
        snapshot: &RepositorySnapshot,
        report: &mut MigrationReport,
    ) {
        report.pipeline_convert.attempted();

        let converted = self
            .pipelines
            .convert_batch(&snapshot.pipelines, !self.options.exclude_disabled_pipelines);
        if converted.is_empty() {
            report.pipeline_convert.succeeded_with("no pipelines to convert");
            return;
        }

        // A failed git transfer leaves the target without history to commit
        // onto, so the generated files are reported but not written.
        let commit_blocked = unit.migrate_git && report.git_transfer.status == StageStatus::Failed;

        for workflow in &converted {
            report.workflow_files.push(workflow.path.clone());
            if self.options.dry_run || commit_blocked {
                report.pipelines_converted += 1;
                continue;
            }

            let written = self
                .retry
                .run("commit workflow file", || {
                    let target = &self.target;
                    let repo = validated.target_name.as_str();
                    let path = workflow.path.as_str();
                    let content = workflow.content.as_str();
                    let message = format!("Add workflow converted from '{}'", workflow.pipeline_name);
                    async move { target.write_file(repo, path, content, &message).await }
                })
                .await;

            match written {
                Ok(()) => report.pipelines_converted += 1,
                Err(err) => {
                    report.add_warning(redact(&format!(
                        "pipeline '{}' could not be committed: {err}",
                        workflow.pipeline_name
                    )));
                }
            }
        }

        if commit_blocked {
            report.pipeline_convert.succeeded_with(
                "workflows generated but not committed: git transfer failed",
            );
            report.add_warning(
                "pipeline files were generated but not committed because git transfer failed",
            );
        } else if self.options.dry_run {
            report
                .pipeline_convert
                .succeeded_with("dry run: workflows generated, not committed");
        } else {
            report.pipeline_convert.succeeded();
        }
    }

    async fn run_issue_migrate(
        &self,
        validated: &ValidatedUnit,
        snapshot: &RepositorySnapshot,
        report: &mut MigrationReport,
    ) {
        report.issue_migrate.attempted();

        let items = &snapshot.work_items;
        if items.is_empty() {
            report.issue_migrate.succeeded_with("no work items to migrate");
            return;
        }

        for item in items {
            let payload = self.work_items.translate(item);
            if self.options.dry_run {
                report.issues_created += 1;
                continue;
            }

            let created = self
                .retry
                .run("create issue", || {
                    let target = &self.target;
                    let repo = validated.target_name.as_str();
                    let payload = &payload;
                    async move { target.create_issue(repo, payload).await }
                })
                .await;

            match created {
                Ok(issue) => {
                    report.issues_created += 1;
                    info!(work_item = item.id, issue = issue.number, "created issue");
                }
                Err(err) => {
                    let message = redact(&format!(
                        "work item {} ('{}') could not be migrated: {err}",
                        item.id, item.title
                    ));
                    warn!("{message}");
                    report.add_warning(message);
                }
            }
        }

        if self.options.dry_run {
            report
                .issue_migrate
                .succeeded_with(format!("dry run: {} issue(s) would be created", items.len()));
        } else {
            report.issue_migrate.succeeded();
        }
    }

    /// Write the report JSON under the configured output directory under a
    /// timestamped name, so repeated runs never overwrite prior reports.
    fn persist(&self, report: &MigrationReport) {
        let Some(directory) = &self.options.output_directory else {
            return;
        };
        if let Err(err) = write_report(directory, report) {
            warn!("could not persist migration report: {err}");
        }
    }
}

/// Serialize one report to `<directory>/<stem>.json`.
pub fn write_report(directory: &Path, report: &MigrationReport) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)?;
    let path = directory.join(format!("{}.json", report.file_stem()));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "wrote migration report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doubles::{RecordingTarget, ScriptedSource};
    use crate::types::{PipelineDef, WorkItem};
    use std::sync::atomic::Ordering;

    fn repo(name: &str, clone_url: Option<&str>) -> RepoRef {
        RepoRef {
            id: format!("src-{name}"),
            name: name.to_string(),
            clone_url: clone_url.map(str::to_string),
            ..Default::default()
        }
    }

    fn work_item(id: u64, title: &str) -> WorkItem {
        WorkItem {
            id,
            title: title.to_string(),
            item_type: "Task".into(),
            state: "New".into(),
            ..Default::default()
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 2.0)
    }

    fn orchestrator(
        source: ScriptedSource,
        target: RecordingTarget,
        options: RunOptions,
    ) -> (MigrationOrchestrator, Arc<ScriptedSource>, Arc<RecordingTarget>) {
        let source = Arc::new(source);
        let target = Arc::new(target);
        let orchestrator = MigrationOrchestrator::new(
            source.clone(),
            target.clone(),
            GitTransferEngine::new(Duration::from_secs(60)),
            WorkItemTranslator::default(),
            fast_retry(),
            options,
        );
        (orchestrator, source, target)
    }

    fn seed_git_repo(dir: &std::path::Path, branches: usize, tags: usize) {
        let run = |args: &[&str]| {
            let out = std::process::Command::new("git")
                .args(args)
                .current_dir(dir)
                .output()
                .unwrap();
            assert!(out.status.success(), "git {args:?}: {out:?}");
        };
        run(&["init", "--initial-branch=main"]);
        run(&["config", "user.email", "t@example.com"]);
        run(&["config", "user.name", "t"]);
        std::fs::write(dir.join("README.md"), "seed").unwrap();
        run(&["add", "."]);
        run(&["commit", "-m", "initial"]);
        for i in 1..branches {
            run(&["branch", &format!("feature-{i}")]);
        }
        for i in 1..=tags {
            run(&["tag", &format!("v{i}")]);
        }
    }

    #[tokio::test]
    async fn test_full_unit_transfers_git_history() {
        let source_dir = tempfile::TempDir::new().unwrap();
        let target_dir = tempfile::TempDir::new().unwrap();
        seed_git_repo(source_dir.path(), 3, 2);
        std::process::Command::new("git")
            .args(["init", "--bare"])
            .current_dir(target_dir.path())
            .output()
            .unwrap();

        let mut source = ScriptedSource::default();
        source.repos.insert(
            "Web".into(),
            vec![repo("shop", Some(&source_dir.path().to_string_lossy()))],
        );
        let target = RecordingTarget {
            push_url: Some(target_dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        };

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_pipelines = false;
        let (orchestrator, _, target) = orchestrator(source, target, RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        assert!(report.success, "errors: {:?}", report.errors);
        assert_eq!(report.final_state, "done");
        assert_eq!(report.branches_migrated, 3);
        assert_eq!(report.tags_migrated, 2);
        assert_eq!(report.commits_migrated, 1);
        assert_eq!(target.created_repos.lock().unwrap().as_slice(), ["shop"]);
    }

    #[tokio::test]
    async fn test_dry_run_performs_zero_mutating_calls() {
        let source_dir = tempfile::TempDir::new().unwrap();
        seed_git_repo(source_dir.path(), 2, 1);

        let mut source = ScriptedSource::default();
        source.repos.insert(
            "Web".into(),
            vec![repo("shop", Some(&source_dir.path().to_string_lossy()))],
        );
        source
            .work_items
            .insert("Web".into(), vec![work_item(1, "One"), work_item(2, "Two")]);
        source.pipelines.insert(
            "Web".into(),
            vec![PipelineDef {
                id: 1,
                name: "CI".into(),
                ..Default::default()
            }],
        );

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_issues = true;
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let (orchestrator, source, target) =
            orchestrator(source, RecordingTarget::default(), options);

        let report = orchestrator.run_unit(&unit).await;
        assert!(report.success);
        assert_eq!(target.mutating_calls.load(Ordering::SeqCst), 0);
        assert!(source.read_calls.load(Ordering::SeqCst) > 0);
        // Counts still come from the real clone and the real fixtures.
        assert_eq!(report.branches_migrated, 2);
        assert_eq!(report.pipelines_converted, 1);
        assert_eq!(report.issues_created, 2);
        assert_eq!(report.workflow_files, vec![".github/workflows/ci.yml"]);
    }

    #[tokio::test]
    async fn test_missing_source_repo_fails_validation() {
        let source = ScriptedSource::default();
        let unit = MigrationUnit::new("Web", "ghost");
        let (orchestrator, _, target) =
            orchestrator(source, RecordingTarget::default(), RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        assert!(!report.success);
        assert_eq!(report.final_state, "failed");
        assert!(report.errors[0].contains("not found"));
        // No stage ran.
        assert_eq!(report.git_transfer.status, crate::types::StageStatus::Skipped);
        assert_eq!(target.mutating_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_target_repo_is_reused() {
        let mut source = ScriptedSource::default();
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/tmp/unused"))]);
        let target = RecordingTarget::default();
        target
            .existing
            .lock()
            .unwrap()
            .push(repo("shop", None));

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_git = false;
        unit.migrate_pipelines = false;
        let (orchestrator, _, target) = orchestrator(source, target, RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        assert!(report.success);
        assert!(target.created_repos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_bad_work_item_does_not_abort_the_rest() {
        let mut source = ScriptedSource::default();
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/tmp/unused"))]);
        source.work_items.insert(
            "Web".into(),
            (1..=5).map(|i| work_item(i, &format!("Item {i}"))).collect(),
        );
        let target = RecordingTarget {
            rejected_issue_titles: vec!["Item 3".into()],
            ..Default::default()
        };

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_git = false;
        unit.migrate_pipelines = false;
        unit.migrate_issues = true;
        let (orchestrator, _, target) = orchestrator(source, target, RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        assert!(report.success, "item-level failures must not flip success");
        assert_eq!(report.issues_created, 4);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("work item 3"));
        assert_eq!(target.issues.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_transient_work_item_listing_is_retried() {
        let mut source = ScriptedSource::default();
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/tmp/unused"))]);
        source
            .work_items
            .insert("Web".into(), vec![work_item(1, "Only")]);
        source.work_item_failures.store(2, Ordering::SeqCst);

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_git = false;
        unit.migrate_pipelines = false;
        unit.migrate_issues = true;
        let (orchestrator, _, _) =
            orchestrator(source, RecordingTarget::default(), RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        assert!(report.success);
        assert_eq!(report.issues_created, 1);
    }

    #[tokio::test]
    async fn test_git_stage_failure_does_not_block_issue_stage() {
        let mut source = ScriptedSource::default();
        // Clone source does not exist, so the git stage fails.
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/nonexistent/repo"))]);
        source
            .work_items
            .insert("Web".into(), vec![work_item(1, "Survivor")]);

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_pipelines = false;
        unit.migrate_issues = true;
        let (orchestrator, _, target) =
            orchestrator(source, RecordingTarget::default(), RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        assert!(!report.success);
        assert_eq!(report.final_state, "done");
        assert_eq!(report.git_transfer.status, crate::types::StageStatus::Failed);
        assert_eq!(report.issue_migrate.status, crate::types::StageStatus::Succeeded);
        assert_eq!(report.issues_created, 1);
        assert_eq!(target.issues.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_credentials_never_reach_the_report() {
        let mut source = ScriptedSource::default();
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/tmp/unused"))]);
        source.clone_url_override =
            Some("file://user:hunter2-token@/nonexistent/Web/_git/shop".into());

        // The authenticated URL points nowhere, so the clone fails and its
        // error text would carry the URL.
        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_pipelines = false;
        let (orchestrator, _, _) =
            orchestrator(source, RecordingTarget::default(), RunOptions::default());

        let report = orchestrator.run_unit(&unit).await;
        let serialized = serde_json::to_string(&report).unwrap();
        assert!(!serialized.contains("hunter2-token"));
    }

    #[tokio::test]
    async fn test_skip_issues_suppresses_the_stage_globally() {
        let mut source = ScriptedSource::default();
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/tmp/unused"))]);
        source
            .work_items
            .insert("Web".into(), vec![work_item(1, "Ignored")]);

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_git = false;
        unit.migrate_pipelines = false;
        unit.migrate_issues = true;
        let options = RunOptions {
            skip_issues: true,
            ..Default::default()
        };
        let (orchestrator, _, target) =
            orchestrator(source, RecordingTarget::default(), options);

        let report = orchestrator.run_unit(&unit).await;
        assert!(report.success);
        assert_eq!(report.issues_created, 0);
        assert_eq!(report.issue_migrate.status, StageStatus::Skipped);
        assert!(report
            .issue_migrate
            .detail
            .as_deref()
            .unwrap()
            .contains("skip_issues"));
        assert_eq!(target.mutating_calls.load(Ordering::SeqCst), 1); // repo creation only
    }

    #[tokio::test]
    async fn test_report_is_persisted_with_timestamped_name() {
        let out = tempfile::TempDir::new().unwrap();
        let mut source = ScriptedSource::default();
        source
            .repos
            .insert("Web".into(), vec![repo("shop", Some("/tmp/unused"))]);

        let mut unit = MigrationUnit::new("Web", "shop");
        unit.migrate_git = false;
        unit.migrate_pipelines = false;
        let options = RunOptions {
            output_directory: Some(out.path().to_path_buf()),
            ..Default::default()
        };
        let (orchestrator, _, _) =
            orchestrator(source, RecordingTarget::default(), options);

        orchestrator.run_unit(&unit).await;
        let entries: Vec<_> = std::fs::read_dir(out.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        let name = name.to_string_lossy();
        assert!(name.starts_with("migration_report_Web_shop_"));
        assert!(name.ends_with(".json"));
    }
}
