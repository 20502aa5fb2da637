//! Configuration file loader for `.team-kit/` directory structure.
//!
//! This module provides functionality to load and parse all configuration files
//! from the `.team-kit/` directory, including:
//! - `config.toml`: Global settings
//! - `agents/*.md`: Agent definitions with YAML front matter
//! - `teams/*.yaml`: Team definitions

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tk_protocol::agent_models::AgentDefinition;
use tk_protocol::config_models::GlobalConfig;
use tk_protocol::team_models::TeamDefinition;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the project directory holding all configuration.
pub const PROJECT_DIR: &str = ".team-kit";

/// Loads all configuration from the `.team-kit/` directory.
///
/// This function scans the `.team-kit/` directory and loads:
/// - Global configuration from `config.toml`
/// - Agent definitions from `agents/*.md` files
/// - Team definitions from `teams/*.yaml` files
///
/// Loading is deterministic: files are visited in name order and the
/// resulting agents and teams are sorted by name, so loading the same
/// directory twice yields equal configurations.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.team-kit/` folder
///
/// # Returns
///
/// An `AppConfig` containing all loaded configuration. If directories or files
/// are missing (but the root exists), returns an empty/default configuration
/// rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML, YAML, or Markdown front matter)
/// - Required fields are missing in configuration files
///
/// # Example
///
/// ```rust,no_run
/// use tk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} agents", config.agents.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let tk_dir = root.join(PROJECT_DIR);

    // If .team-kit doesn't exist, return default config
    if !tk_dir.exists() {
        debug!(path = %tk_dir.display(), "no project directory, using defaults");
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&tk_dir)?;

    let mut agents = load_agents(&tk_dir)?;
    agents.sort_by(|a, b| a.name.cmp(&b.name));

    let mut teams = load_teams(&tk_dir)?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(agents = agents.len(), teams = teams.len(), "configuration loaded");

    Ok(AppConfig {
        global,
        agents,
        teams,
    })
}

/// Loads global configuration from `config.toml`.
fn load_global_config(tk_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = tk_dir.join("config.toml");

    // If config.toml doesn't exist, return default
    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: GlobalConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path,
            source,
        })?;

    Ok(config)
}

/// Files directly inside `dir` with one of `extensions`, in name order.
fn files_with_extension(dir: &Path, extensions: &[&str]) -> ConfigResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        let ext = path.extension().and_then(|s| s.to_str());
        if entry.file_type().is_file() && ext.is_some_and(|e| extensions.contains(&e)) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Loads all agent definitions from `agents/*.md`.
fn load_agents(tk_dir: &Path) -> ConfigResult<Vec<AgentDefinition>> {
    let agents_dir = tk_dir.join("agents");

    // If agents directory doesn't exist, return empty vector
    if !agents_dir.exists() {
        return Ok(Vec::new());
    }

    let mut agents = Vec::new();

    for path in files_with_extension(&agents_dir, &["md"])? {
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
            path: path.clone(),
            source,
        })?;

        agents.push(parse_agent(&path, &content)?);
    }

    Ok(agents)
}

/// Parses one agent file: YAML front matter plus the instruction body.
pub fn parse_agent(path: &Path, content: &str) -> ConfigResult<AgentDefinition> {
    let matter = Matter::<YAML>::new();
    let result = matter.parse(content);

    let mut agent: AgentDefinition = result
        .data
        .ok_or_else(|| ConfigError::MarkdownParse {
            path: path.to_path_buf(),
            reason: "Missing YAML front matter".to_string(),
        })?
        .deserialize()
        .map_err(|e| ConfigError::MarkdownParse {
            path: path.to_path_buf(),
            reason: format!("Failed to deserialize front matter: {e}"),
        })?;

    if agent.name.trim().is_empty() {
        return Err(ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            reason: "agent name must not be empty".to_string(),
        });
    }

    // The markdown body is the agent's instruction
    agent.instruction = result.content.trim().to_string();

    Ok(agent)
}

/// Loads all team definitions from `teams/*.yaml`.
fn load_teams(tk_dir: &Path) -> ConfigResult<Vec<TeamDefinition>> {
    let teams_dir = tk_dir.join("teams");

    // If teams directory doesn't exist, return empty vector
    if !teams_dir.exists() {
        return Ok(Vec::new());
    }

    files_with_extension(&teams_dir, &["yaml", "yml"])?
        .iter()
        .map(|path| load_yaml(path))
        .collect()
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
        path: path.to_path_buf(),
        source,
    })
}
