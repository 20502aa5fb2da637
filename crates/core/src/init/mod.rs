//! Initialization module for creating .team-kit directory structures.
//!
//! This module provides functionality to initialize a new team-kit project
//! by generating a `.team-kit/` directory with pre-configured templates for:
//! - Global configuration (`config.toml`)
//! - Agent definitions (`agents/*.md`)
//! - Team definitions (`teams/*.yaml`)
//! - Scripted gateway replies for trying the teams offline (`scripts/*.yaml`)
//!
//! # Example
//!
//! ```no_run
//! use tk_core::init::{InitOptions, generate_team_kit_structure};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! generate_team_kit_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_team_kit_structure, InitOptions};
pub use templates::{get_template, list_templates};
