//! Errors from scaffolding a `.team-kit/` project.

use std::path::PathBuf;
use thiserror::Error;

pub type InitResult<T> = Result<T, InitError>;

#[derive(Debug, Error)]
pub enum InitError {
    /// A project is already present; `init --force` replaces its bundled files.
    #[error(".team-kit directory already exists at {0:?}. Use --force to overwrite.")]
    DirectoryExists(PathBuf),

    /// A bundled agent, team or script is missing from the binary.
    #[error("Bundled template missing: {0}")]
    TemplateNotFound(String),

    /// One of `agents/`, `teams/` or `scripts/` could not be created.
    #[error("Cannot create {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
