//! Embedded template files for .team-kit initialization.
//!
//! This module uses `rust-embed` to embed template files from the workspace
//! root `templates/` directory into the binary at compile time. This allows the
//! CLI to generate `.team-kit/` structures without external file dependencies.

use rust_embed::RustEmbed;

/// Embedded template files from the `templates/` directory.
///
/// The path is calculated relative to the crate root:
/// - `CARGO_MANIFEST_DIR` = `crates/core`
/// - `../../templates` = workspace root `templates/`
///
/// With the `debug-embed` feature the files are embedded in debug builds too.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Get template file content by path.
///
/// # Arguments
/// * `path` - Relative path from templates root (e.g., "config.toml", "agents/writer.md")
///
/// # Returns
/// The file content as a String, or None if the file doesn't exist.
///
/// # Example
/// ```
/// use tk_core::init::templates::get_template;
///
/// let config = get_template("config.toml").expect("config.toml should exist");
/// assert!(config.contains("default-max-iterations"));
/// ```
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// List all template files under a directory prefix, sorted.
///
/// # Example
/// ```
/// use tk_core::init::templates::list_templates;
///
/// let teams = list_templates("teams/");
/// assert!(teams.contains(&"teams/review-chat.yaml".to_string()));
/// ```
pub fn list_templates(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}
