//! Rendering run events on the terminal.

use colored::{Color, Colorize};
use std::collections::HashMap;
use tk_core::config::AppConfig;
use tk_protocol::events::RunEvent;
use tk_protocol::message_models::{Message, MessageKind, Role};
use tk_protocol::run_models::{RunStatus, StopReason};

/// Prints events either as colored text or as JSON lines.
pub struct Renderer {
    json: bool,
    colors: HashMap<String, Color>,
}

impl Renderer {
    pub fn new(config: &AppConfig, json: bool) -> Self {
        let colors = config
            .agents
            .iter()
            .filter_map(|a| a.color.parse::<Color>().ok().map(|c| (a.name.clone(), c)))
            .collect();
        Self { json, colors }
    }

    pub fn render(&self, event: &RunEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("failed to encode event: {e}"),
            }
            return;
        }

        match event {
            RunEvent::RunStarted { run_id, team } => {
                println!("{} {} {}", "▶".bold(), team.bold(), format!("({run_id})").dimmed());
            }
            RunEvent::TurnStarted { turn, agent, .. } => {
                println!("{}", format!("── turn {turn}: {agent} ──").dimmed());
            }
            RunEvent::MessageAppended { message, .. } => self.render_message(message),
            RunEvent::SelectionFallback {
                requested,
                fallback,
                reason,
                ..
            } => {
                let requested = requested.as_deref().unwrap_or("nobody");
                println!(
                    "{} selection asked for {requested}, {fallback} speaks instead: {reason}",
                    "!".yellow().bold()
                );
            }
            RunEvent::ToolFailed {
                agent, tool, error, ..
            } => {
                println!("{} {agent}'s call to {tool} failed: {error}", "!".red().bold());
            }
            RunEvent::RunSuspended { agent, .. } => {
                println!("{} {agent} is waiting for your reply (type exit to stop)", "⏸".bold());
            }
            RunEvent::RunFinished {
                status,
                reason,
                turns,
                ..
            } => {
                let reason = reason.as_ref().map_or_else(|| "none".to_string(), describe_reason);
                let line = format!("■ {} after {turns} turns (reason: {reason})", status_label(*status));
                match status {
                    RunStatus::Satisfied => println!("{}", line.green().bold()),
                    RunStatus::Failed => println!("{}", line.red().bold()),
                    _ => println!("{}", line.yellow().bold()),
                }
            }
            RunEvent::RunFailed { error, .. } => {
                println!("{} {error}", "✗ run failed:".red().bold());
            }
        }
    }

    fn render_message(&self, message: &Message) {
        let source = message.source_name().unwrap_or("?");
        let name = match self.colors.get(source) {
            Some(color) => source.color(*color).bold(),
            None => source.bold(),
        };

        match (&message.role, &message.kind) {
            (Role::User, MessageKind::Handoff { target }) => {
                println!("{} → {}: {}", "user".green().bold(), target.as_str(), message.content);
            }
            (Role::User, _) => println!("{}: {}", "user".green().bold(), message.content),
            (_, MessageKind::Handoff { target }) => {
                println!("{name} → {}: {}", target.as_str().bold(), message.content);
            }
            (_, MessageKind::ToolCall { call }) => {
                println!("{name} calls {}({})", call.name.italic(), call.arguments);
            }
            (_, MessageKind::ToolResult { name: tool, is_error, .. }) => {
                let line = format!("  ↳ {tool}: {}", message.content);
                if *is_error {
                    println!("{}", line.red());
                } else {
                    println!("{}", line.dimmed());
                }
            }
            _ => println!("{name}: {}", message.content),
        }
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "pending",
        RunStatus::Running => "running",
        RunStatus::AwaitingUser => "awaiting user",
        RunStatus::Satisfied => "satisfied",
        RunStatus::CeilingReached => "ceiling reached",
        RunStatus::Cancelled => "cancelled",
        RunStatus::Failed => "failed",
    }
}

fn describe_reason(reason: &StopReason) -> String {
    match reason {
        StopReason::Keyword { marker } => format!("said {marker}"),
        StopReason::HandoffToUser => "handed off to the user".to_string(),
        StopReason::TextReply => "text reply".to_string(),
        StopReason::JudgeSatisfied => "judge satisfied".to_string(),
        StopReason::IterationCap { max } => format!("{max} turn limit"),
        StopReason::NoNextAgent => "no next agent".to_string(),
    }
}
