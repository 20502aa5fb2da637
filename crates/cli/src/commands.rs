//! Subcommand implementations.

use crate::render::Renderer;
use color_eyre::eyre::{bail, eyre, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tk_core::config::{load_config, AppConfig, PROJECT_DIR};
use tk_core::engine::{Orchestrator, TeamBuilder};
use tk_core::gateway::{FnGateway, GatewayError, ModelGateway, ScriptedGateway};
use tk_core::init::{generate_team_kit_structure, InitOptions};
use tk_core::tools::ToolRegistry;
use tk_protocol::run_models::RunStatus;
use tk_protocol::team_models::{SelectionConfig, TeamDefinition};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub async fn init(root: &Path, force: bool, minimal: bool) -> Result<()> {
    let dir = generate_team_kit_structure(InitOptions {
        target_dir: root.to_path_buf(),
        force,
        minimal,
    })
    .await?;

    println!("{} {}", "Created".green().bold(), dir.display());
    println!("Try: team-kit run review-chat --task \"Write a slogan for a seaside town\"");
    Ok(())
}

/// Load the project configuration, failing early when there is none.
pub async fn load(root: &Path) -> Result<AppConfig> {
    let dir = root.join(PROJECT_DIR);
    if !dir.is_dir() {
        bail!(
            "No {} directory in {}. Run `team-kit init` first.",
            PROJECT_DIR,
            root.display()
        );
    }
    Ok(load_config(root).await?)
}

pub fn list(config: &AppConfig) -> Result<()> {
    println!("{}", "Agents".bold());
    for agent in &config.agents {
        println!("  {} ({}) {}", agent.name.cyan(), agent.model, agent.description.dimmed());
        if !agent.tools.is_empty() {
            println!("      tools: {}", agent.tools.join(", "));
        }
        if !agent.handoffs.is_empty() {
            println!("      hands off to: {}", agent.handoffs.join(", "));
        }
    }

    println!("{}", "Teams".bold());
    for team in &config.teams {
        println!(
            "  {} [{}] {}",
            team.name.cyan(),
            strategy_name(team),
            team.description.dimmed()
        );
        println!("      agents: {}", team.agents.join(", "));
    }
    Ok(())
}

/// Validate the configuration and build every team without running it.
pub fn validate(config: &AppConfig) -> Result<()> {
    let tools = ToolRegistry::builtin();
    config.validate(&tools)?;

    for team in &config.teams {
        build(config, team, unreachable_gateway(), &tools)?;
    }

    println!(
        "{} {} agents, {} teams",
        "OK".green().bold(),
        config.agents.len(),
        config.teams.len()
    );
    Ok(())
}

pub fn graph(config: &AppConfig, team_name: &str) -> Result<()> {
    let tools = ToolRegistry::builtin();
    let team = find_team(config, team_name)?;
    let orchestrator = build(config, team, unreachable_gateway(), &tools)?;
    print!("{}", orchestrator.roster().handoff_graph_dot(&team.name));
    Ok(())
}

/// Run a team against scripted model replies, asking on stdin whenever an
/// agent hands off to the user.
pub async fn run(
    root: &Path,
    config: &AppConfig,
    team_name: &str,
    task: String,
    script: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let tools = ToolRegistry::builtin();
    config.validate(&tools)?;
    let team = find_team(config, team_name)?;

    let script = script.unwrap_or_else(|| {
        root.join(PROJECT_DIR)
            .join("scripts")
            .join(format!("{team_name}.yaml"))
    });
    let gateway = ScriptedGateway::load(&script).map_err(|e| eyre!("{e:#}"))?;
    let orchestrator = build(config, team, Arc::new(gateway), &tools)?;

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let suspended = Arc::new(Notify::new());
    let printer = {
        let renderer = Renderer::new(config, json);
        let suspended = Arc::clone(&suspended);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                renderer.render(&event);
                if event.is_final() {
                    suspended.notify_one();
                }
            }
        })
    };

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut state = orchestrator.new_run();
    let mut outcome = orchestrator
        .execute(&mut state, task, &events_tx, &cancel)
        .await;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while outcome.is_ok() && state.status == RunStatus::AwaitingUser {
        // Let the printer show the hand-off before prompting.
        suspended.notified().await;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let input = match stdin.next_line().await? {
            Some(line) if !matches!(line.trim(), "exit" | "quit") => line,
            _ => {
                debug!(run_id = %state.id, "user left the conversation");
                break;
            }
        };
        outcome = orchestrator
            .resume(&mut state, input, &events_tx, &cancel)
            .await;
    }

    drop(events_tx);
    let _ = printer.await;
    ctrl_c.abort();

    outcome?;
    Ok(())
}

fn find_team<'a>(config: &'a AppConfig, name: &str) -> Result<&'a TeamDefinition> {
    config.find_team(name).ok_or_else(|| {
        let known: Vec<&str> = config.teams.iter().map(|t| t.name.as_str()).collect();
        eyre!("Unknown team '{name}'. Known teams: {}", known.join(", "))
    })
}

fn build(
    config: &AppConfig,
    team: &TeamDefinition,
    gateway: Arc<dyn ModelGateway>,
    tools: &ToolRegistry,
) -> Result<Orchestrator> {
    Ok(TeamBuilder::new(&config.agents, gateway, tools)
        .with_global(config.global.clone())
        .build(team)?)
}

/// Gateway for commands that build a team but never run it.
fn unreachable_gateway() -> Arc<dyn ModelGateway> {
    Arc::new(FnGateway::new(|request| {
        Err(GatewayError::Network(format!(
            "no model gateway configured for {}",
            request.agent
        )))
    }))
}

fn strategy_name(team: &TeamDefinition) -> &'static str {
    match team.selection {
        SelectionConfig::FixedOrder { .. } => "fixed-order",
        SelectionConfig::Handoff { .. } => "handoff",
        SelectionConfig::Judge { .. } => "judge",
    }
}
