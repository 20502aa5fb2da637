//! Main entry point for the team-kit binary.

mod commands;
mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "team-kit", version, about = "Run teams of LLM agents that share one conversation")]
struct Cli {
    /// Project root containing the .team-kit directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log filter; overrides config.toml, overridden by RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a .team-kit directory with starter agents and teams.
    Init {
        /// Overwrite an existing .team-kit directory.
        #[arg(long)]
        force: bool,

        /// Only create the review-chat team.
        #[arg(long)]
        minimal: bool,
    },

    /// List configured agents and teams.
    List,

    /// Check every agent and team definition.
    Validate,

    /// Print the hand-off graph of a team in Graphviz DOT format.
    Graph { team: String },

    /// Run a team on a task.
    Run {
        team: String,

        /// The task given to the team as the first user message.
        #[arg(long, short)]
        task: String,

        /// Scripted gateway replies; defaults to .team-kit/scripts/<team>.yaml.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Print events as JSON lines instead of colored text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Init { force, minimal } => {
            init_logging(cli.log_level.as_deref());
            commands::init(&cli.root, force, minimal).await
        }
        command => {
            let config = commands::load(&cli.root).await?;
            init_logging(cli.log_level.as_deref().or(Some(config.global.log_level.as_str())));

            match command {
                Command::List => commands::list(&config),
                Command::Validate => commands::validate(&config),
                Command::Graph { team } => commands::graph(&config, &team),
                Command::Run {
                    team,
                    task,
                    script,
                    json,
                } => commands::run(&cli.root, &config, &team, task, script, json).await,
                Command::Init { .. } => Ok(()),
            }
        }
    }
}

/// Logs go to stderr so that `--json` output on stdout stays parseable.
fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
