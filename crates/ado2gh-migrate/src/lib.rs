//! # Azure DevOps to GitHub Migration
//!
//! This crate moves a repository's assets from Azure DevOps to GitHub:
//! git history via mirror clone/push, build pipeline definitions as
//! GitHub Actions workflow files, and work items as issues.
//!
//! ## Features
//!
//! - **Git Transfer**: Full-history mirror migration with branch/tag counts
//!   and optional post-push remote verification
//! - **Pipeline Conversion**: Build definitions rendered as Actions workflows
//! - **Work Item Migration**: Work items recreated as labeled issues
//! - **Dry Run**: Read-only rehearsal that reports what would change
//! - **Resilience**: Per-call rate limiting and retry with exponential backoff
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use ado2gh_migrate::{BatchRunner, MigrationOrchestrator, MigrationSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = MigrationSettings::load(Path::new("config.yml"))?;
//!     let orchestrator = MigrationOrchestrator::from_settings(&settings, false)?;
//!
//!     let plan = ado2gh_migrate::load_plan(Path::new("plan.yml"))?;
//!     let reports = BatchRunner::new(&orchestrator).run(&plan).await;
//!
//!     for report in &reports {
//!         println!("{}", report.summary());
//!     }
//!     Ok(())
//! }
//! ```

pub mod ado;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod markup;
pub mod naming;
pub mod orchestrator;
pub mod pipeline;
pub mod plan;
pub mod ratelimit;
pub mod retry;
pub mod types;
pub mod workitem;

#[cfg(test)]
pub(crate) mod doubles;

// Re-export main types
pub use ado::AdoClient;
pub use batch::BatchRunner;
pub use client::{SourcePlatform, TargetPlatform};
pub use config::MigrationSettings;
pub use error::{FailureKind, MigrationError, Result};
pub use git::GitTransferEngine;
pub use github::GitHubClient;
pub use orchestrator::{MigrationOrchestrator, MigrationState, RunOptions};
pub use pipeline::PipelineTranslator;
pub use plan::load_plan;
pub use ratelimit::RateLimiter;
pub use retry::RetryPolicy;
pub use types::*;
pub use workitem::WorkItemTranslator;

/// Version of the migration tools.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
