//! ado2gh CLI - Azure DevOps to GitHub migration tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// ado2gh - Migrate repositories, pipelines, and work items from
/// Azure DevOps to GitHub
#[derive(Parser, Debug)]
#[command(name = "ado2gh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, default_value = "config.yml", global = true)]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate a single repository
    Migrate {
        /// Source project name
        #[arg(short, long)]
        project: String,
        /// Source repository name
        #[arg(short, long)]
        repo: String,
        /// Target repository name (default: sanitized source name)
        #[arg(long)]
        target_name: Option<String>,
        /// Rehearse without mutating the target
        #[arg(long)]
        dry_run: bool,
        /// Skip git history transfer
        #[arg(long)]
        no_git: bool,
        /// Skip pipeline conversion
        #[arg(long)]
        no_pipelines: bool,
        /// Skip work item migration
        #[arg(long)]
        no_issues: bool,
        /// Compare branch heads on the target after the push
        #[arg(long)]
        verify_remote: bool,
    },

    /// Migrate every unit in a plan file
    Batch {
        /// Plan file (YAML or JSON list of units)
        #[arg(short, long)]
        plan: PathBuf,
        /// Rehearse without mutating the target
        #[arg(long)]
        dry_run: bool,
    },

    /// List source projects
    Projects,

    /// List repositories in a source project
    Repos {
        /// Source project name
        #[arg(short, long)]
        project: String,
    },

    /// Check credentials and local tooling
    Doctor,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ado2gh={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match cli.command {
        Commands::Migrate {
            project,
            repo,
            target_name,
            dry_run,
            no_git,
            no_pipelines,
            no_issues,
            verify_remote,
        } => {
            commands::migrate(
                &cli.config,
                commands::MigrateArgs {
                    project,
                    repo,
                    target_name,
                    dry_run,
                    no_git,
                    no_pipelines,
                    no_issues,
                    verify_remote,
                },
            )
            .await
        }
        Commands::Batch { plan, dry_run } => commands::batch(&cli.config, &plan, dry_run).await,
        Commands::Projects => commands::projects(&cli.config).await,
        Commands::Repos { project } => commands::repos(&cli.config, &project).await,
        Commands::Doctor => commands::doctor(&cli.config).await,
        Commands::Version => {
            println!("ado2gh {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
