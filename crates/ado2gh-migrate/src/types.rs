//! Common types for migration operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming;

/// Scope used when fetching pipeline definitions for a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineScope {
    /// All pipelines in the source project.
    #[default]
    Project,
    /// Only pipelines bound to the unit's repository.
    Repository,
}

/// One repository's end-to-end migration intent.
///
/// Created by the planning phase or a hand-authored plan file; immutable once
/// handed to the orchestrator. One unit produces exactly one
/// [`MigrationReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationUnit {
    /// Source project name.
    pub project: String,

    /// Source repository name.
    pub repo: String,

    /// Target repository name (defaults to the sanitized source name).
    /// Plan files may spell this `target_name`, matching the CLI flag.
    #[serde(default, alias = "target_name")]
    pub target_repo_name: Option<String>,

    /// Migrate git history.
    #[serde(default = "default_true")]
    pub migrate_git: bool,

    /// Convert and commit pipeline definitions.
    #[serde(default = "default_true")]
    pub migrate_pipelines: bool,

    /// Migrate work items as issues. A plan record omitting this flag means
    /// "do not migrate issues", not an error.
    #[serde(default)]
    pub migrate_issues: bool,

    /// Pipeline fetch scope for this unit.
    #[serde(default)]
    pub pipeline_scope: PipelineScope,

    /// Planning metadata; does not affect behavior.
    #[serde(default)]
    pub priority: Option<String>,

    /// Planning metadata; does not affect behavior.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl MigrationUnit {
    /// Minimal unit with default flags.
    pub fn new(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            target_repo_name: None,
            migrate_git: true,
            migrate_pipelines: true,
            migrate_issues: false,
            pipeline_scope: PipelineScope::Project,
            priority: None,
            description: None,
        }
    }

    /// The effective target repository name.
    pub fn target_name(&self) -> String {
        match &self.target_repo_name {
            Some(name) => name.clone(),
            None => naming::sanitize_repo_name(&self.repo),
        }
    }
}

/// Outcome status of one migration stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Stage was not requested for this unit.
    #[default]
    Skipped,
    /// Stage started but has not finished.
    Attempted,
    /// Stage completed successfully.
    Succeeded,
    /// Stage failed; later stages still run.
    Failed,
}

/// Per-stage outcome record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageOutcome {
    pub status: StageStatus,
    /// Human-readable detail (failure reason, dry-run note).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageOutcome {
    pub fn attempted(&mut self) {
        self.status = StageStatus::Attempted;
    }

    pub fn skipped_with(&mut self, detail: impl Into<String>) {
        self.status = StageStatus::Skipped;
        self.detail = Some(detail.into());
    }

    pub fn succeeded(&mut self) {
        self.status = StageStatus::Succeeded;
    }

    pub fn succeeded_with(&mut self, detail: impl Into<String>) {
        self.status = StageStatus::Succeeded;
        self.detail = Some(detail.into());
    }

    pub fn failed(&mut self, detail: impl Into<String>) {
        self.status = StageStatus::Failed;
        self.detail = Some(detail.into());
    }
}

/// Result of comparing local branches against the pushed remote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteVerification {
    pub local_branches: usize,
    pub remote_branches: usize,
    /// Local branches absent on the remote after the push.
    pub missing_on_remote: Vec<String>,
    /// Remote branches with no local counterpart.
    pub extra_on_remote: Vec<String>,
    pub matched: bool,
}

/// Outcome record for one [`MigrationUnit`].
///
/// Created at the start of an orchestrator run, mutated incrementally as each
/// stage completes, serialized at the end and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Source project name.
    pub project: String,

    /// Source repository name.
    pub repo: String,

    /// Target repository name.
    pub target_repo: String,

    /// Whether this run was a dry run.
    pub dry_run: bool,

    /// Start time of the run.
    pub started_at: DateTime<Utc>,

    /// End time of the run.
    pub completed_at: Option<DateTime<Utc>>,

    /// Final state of the unit's state machine.
    pub final_state: String,

    /// Git transfer stage outcome.
    pub git_transfer: StageOutcome,

    /// Pipeline conversion stage outcome.
    pub pipeline_convert: StageOutcome,

    /// Issue migration stage outcome.
    pub issue_migrate: StageOutcome,

    /// Number of branches transferred (counted from the local mirror).
    pub branches_migrated: usize,

    /// Number of tags transferred.
    pub tags_migrated: usize,

    /// Number of commits transferred.
    pub commits_migrated: usize,

    /// Number of pipeline definitions converted to workflows.
    pub pipelines_converted: usize,

    /// Workflow filenames produced (or intended, in dry-run mode).
    pub workflow_files: Vec<String>,

    /// Number of issues created on the target.
    pub issues_created: usize,

    /// Remote branch verification, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_verification: Option<RemoteVerification>,

    /// Non-fatal, item-level problems.
    pub warnings: Vec<String>,

    /// Stage-level and fatal errors.
    pub errors: Vec<String>,

    /// Overall success: validation passed and no stage failed. Item-level
    /// warnings do not flip this.
    pub success: bool,
}

impl MigrationReport {
    /// Create a report for the given unit at the start of a run.
    pub fn new(unit: &MigrationUnit, dry_run: bool) -> Self {
        Self {
            project: unit.project.clone(),
            repo: unit.repo.clone(),
            target_repo: unit.target_name(),
            dry_run,
            started_at: Utc::now(),
            completed_at: None,
            final_state: "pending".to_string(),
            git_transfer: StageOutcome::default(),
            pipeline_convert: StageOutcome::default(),
            issue_migrate: StageOutcome::default(),
            branches_migrated: 0,
            tags_migrated: 0,
            commits_migrated: 0,
            pipelines_converted: 0,
            workflow_files: Vec::new(),
            issues_created: 0,
            remote_verification: None,
            warnings: Vec::new(),
            errors: Vec::new(),
            success: false,
        }
    }

    /// Record a non-fatal warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a stage-level or fatal error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Finalize timestamps and the success boolean.
    pub fn complete(&mut self, final_state: &str) {
        self.completed_at = Some(Utc::now());
        self.final_state = final_state.to_string();
        self.success = final_state != "failed"
            && self.git_transfer.status != StageStatus::Failed
            && self.pipeline_convert.status != StageStatus::Failed
            && self.issue_migrate.status != StageStatus::Failed;
    }

    /// Duration of the run, when complete.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    /// Filename stem keying this report by unit and timestamp, so repeated
    /// runs never overwrite prior reports.
    pub fn file_stem(&self) -> String {
        format!(
            "migration_report_{}_{}_{}",
            self.project,
            self.repo,
            self.started_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Render a human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Migration Summary ===\n");
        out.push_str(&format!(
            "Unit:              {}/{} -> {}\n",
            self.project, self.repo, self.target_repo
        ));
        out.push_str(&format!(
            "Dry run:           {}\n",
            if self.dry_run { "yes" } else { "no" }
        ));
        out.push_str(&format!("Git transfer:      {:?}\n", self.git_transfer.status));
        out.push_str(&format!(
            "  Branches/tags:   {}/{}\n",
            self.branches_migrated, self.tags_migrated
        ));
        out.push_str(&format!("  Commits:         {}\n", self.commits_migrated));
        out.push_str(&format!(
            "Pipelines:         {:?} ({} converted)\n",
            self.pipeline_convert.status, self.pipelines_converted
        ));
        out.push_str(&format!(
            "Issues:            {:?} ({} created)\n",
            self.issue_migrate.status, self.issues_created
        ));
        if !self.warnings.is_empty() {
            out.push_str(&format!("Warnings:          {}\n", self.warnings.len()));
            for w in &self.warnings {
                out.push_str(&format!("  - {w}\n"));
            }
        }
        if !self.errors.is_empty() {
            out.push_str(&format!("Errors:            {}\n", self.errors.len()));
            for e in &self.errors {
                out.push_str(&format!("  - {e}\n"));
            }
        }
        out.push_str(&format!(
            "Overall status:    {}\n",
            if self.success { "SUCCESS" } else { "FAILED" }
        ));
        out
    }
}

/// Reference to a source project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

/// Reference to a repository on either platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Size in bytes, when the platform reports it.
    #[serde(default)]
    pub size: Option<u64>,
}

/// A source work item, parsed and validated at the client boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub title: String,
    /// Original work item type (Bug, Task, User Story, ...).
    pub item_type: String,
    /// Original state (New, Active, Closed, ...).
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub repro_steps: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// A source CI pipeline definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    /// Queue status reported by the source ("enabled", "disabled", "paused").
    #[serde(default)]
    pub queue_status: Option<String>,
    /// Repository the definition is bound to, when known.
    #[serde(default)]
    pub repository_id: Option<String>,
    /// Number of agent phases in the original definition, when known.
    #[serde(default)]
    pub phase_count: Option<usize>,
}

impl PipelineDef {
    /// True when the definition is disabled or paused at the source.
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.queue_status.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("disabled") | Some("paused")
        )
    }
}

/// Payload for creating a target issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Reference to a created target issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
}

/// The source-side export bundle for one unit, held in memory for the run.
#[derive(Debug, Clone, Default)]
pub struct RepositorySnapshot {
    pub repository: RepoRef,
    pub work_items: Vec<WorkItem>,
    pub pipelines: Vec<PipelineDef>,
}

/// Label mappings applied by the work item translator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mappings {
    /// Source work item type -> target label.
    #[serde(default)]
    pub work_item_types: HashMap<String, String>,
    /// Source state -> target label. Unmapped states get no label.
    #[serde(default)]
    pub states: HashMap<String, String>,
    /// Source priority (as string) -> target label.
    #[serde(default)]
    pub priorities: HashMap<String, String>,
}
