//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{doc, query, task};
use crate::domain::ProjectKey;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "compass")]
#[command(author, version, about = "Local-first task tracking with dependency-aware ready queues")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new compass project
    Init {
        /// Project name
        name: String,

        /// Task ID prefix (derived from the name if omitted)
        #[arg(long)]
        key: Option<ProjectKey>,

        /// Path to initialize
        #[arg(long, default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Show the next task ready to work on
    Ready {
        /// List every ready task in order
        #[arg(long)]
        all: bool,
    },

    /// Show blocked tasks
    Blocked,

    /// Manage documents
    #[command(subcommand)]
    Doc(doc::DocCommands),

    /// Search task and document titles and bodies (case-insensitive)
    Search {
        /// Text to look for
        query: String,
    },

    /// Inspect the dependency graph
    #[command(subcommand)]
    Graph(query::GraphCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format,
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("Compass starting");

    match cli.command {
        Commands::Init { name, key, path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path, &name, key)?;
            output.verbose_ctx(
                "init",
                &format!("Using .compass directory at: {}", project.compass_dir().display()),
            );
            if output.is_json() {
                output.data(&serde_json::json!({
                    "root": project.root().display().to_string(),
                    "name": project.config().project.name,
                    "key": project.key(),
                }));
            } else {
                output.success(&format!(
                    "Initialized compass project {} ({}) at {}",
                    project.config().project.name,
                    project.key(),
                    project.root().display()
                ));
            }
        }

        Commands::Task(cmd) => task::run(cmd, &output)?,

        Commands::Ready { all } => {
            output.verbose_ctx("ready", &format!("Querying ready tasks, all={}", all));
            query::ready(&output, all)?
        }
        Commands::Blocked => query::blocked(&output)?,

        Commands::Doc(cmd) => doc::run(cmd, &output)?,
        Commands::Search { query: text } => query::search(&output, &text)?,

        Commands::Graph(cmd) => query::graph(cmd, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
