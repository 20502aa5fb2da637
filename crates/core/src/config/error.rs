//! Errors raised while reading a `.team-kit/` project.
//!
//! Parsing errors name the offending file. Problems that only show up when
//! agents, teams and tools are checked against each other are collected
//! into a single [`ConfigError::Validation`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// `config.toml`, an agent file or a team file could not be read.
    #[error("Cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `config.toml` is not valid TOML or has mistyped settings.
    #[error("Invalid config.toml at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A team file does not describe a team.
    #[error("Invalid team file {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// An agent file lacks front matter, or the front matter is not an agent.
    #[error("Invalid agent file {path}: {reason}")]
    MarkdownParse { path: PathBuf, reason: String },

    #[error("Cannot scan {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// An agent file parsed but names no agent.
    #[error("Invalid agent in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// Cross-reference problems, joined with `; `: reserved or duplicate
    /// names, teams naming unknown agents, hand-offs outside the team,
    /// tools missing from the registry and zero turn limits.
    #[error("Invalid project: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
