//! Directory structure and file generation for .team-kit initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::PROJECT_DIR;
use std::fs;
use std::path::{Path, PathBuf};

/// Files written by `--minimal`: one two-agent group chat and its script.
const MINIMAL_TEMPLATES: &[&str] = &[
    "agents/reviewer.md",
    "agents/writer.md",
    "teams/review-chat.yaml",
    "scripts/review-chat.yaml",
];

/// Options for initializing a .team-kit directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Target directory where .team-kit will be created.
    pub target_dir: PathBuf,

    /// Overwrite existing .team-kit directory if it exists.
    pub force: bool,

    /// Create minimal template (only the review-chat team).
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a .team-kit directory structure with templates.
///
/// ```text
/// .team-kit/
/// ├── config.toml
/// ├── agents/     reviewer.md, writer.md, ... (only the first two if minimal)
/// ├── teams/      review-chat.yaml, ...
/// └── scripts/    one scripted gateway reply file per team
/// ```
///
/// # Errors
///
/// Fails if the directory already exists and `force` is not set, if an
/// embedded template is missing, or if the file system refuses a write.
pub async fn generate_team_kit_structure(options: InitOptions) -> InitResult<PathBuf> {
    let tk_dir = options.target_dir.join(PROJECT_DIR);

    if tk_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(tk_dir));
    }

    for sub in ["agents", "teams", "scripts"] {
        let path = tk_dir.join(sub);
        fs::create_dir_all(&path).map_err(|source| InitError::DirectoryCreate { path, source })?;
    }

    write_template_file(&tk_dir, "config.toml")?;

    if options.minimal {
        for path in MINIMAL_TEMPLATES {
            write_template_file(&tk_dir, path)?;
        }
    } else {
        for prefix in ["agents/", "teams/", "scripts/"] {
            for path in list_templates(prefix) {
                write_template_file(&tk_dir, &path)?;
            }
        }
    }

    Ok(tk_dir)
}

/// Copy one embedded template to the same relative path under `tk_dir`.
fn write_template_file(tk_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = tk_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}
