//! Application configuration for flowgraph.
//!
//! User config lives at `~/.flowgraph/flowgraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlowGraphError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "flowgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".flowgraph";

// ---------------------------------------------------------------------------
// Config structs (matching flowgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Grammar tuning.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Pipeline behaviour.
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// `[parser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Lines after a decision declaration searched for `# YES:` / `# NO:`.
    #[serde(default = "default_code_branch_lookahead")]
    pub code_branch_lookahead: usize,

    /// Lines after a decision step searched for `Yes:` / `No:` redirections.
    #[serde(default = "default_step_branch_lookahead")]
    pub step_branch_lookahead: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            code_branch_lookahead: default_code_branch_lookahead(),
            step_branch_lookahead: default_step_branch_lookahead(),
        }
    }
}

fn default_code_branch_lookahead() -> usize {
    3
}
fn default_step_branch_lookahead() -> usize {
    5
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Trimmed input shorter than this counts as no content.
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,

    /// Substitute the bundled sample when input is missing or unrecognized.
    #[serde(default = "default_true")]
    pub use_fallback_sample: bool,

    /// Documents parsed at once in batch mode.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_len: default_min_content_len(),
            use_fallback_sample: true,
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

fn default_min_content_len() -> usize {
    50
}
fn default_true() -> bool {
    true
}
fn default_batch_concurrency() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Lookahead windows used by both text grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Window for `# YES:` / `# NO:` after an annotated decision.
    pub code_branch_lookahead: usize,
    /// Window for `Yes:` / `No:` lines after a decision step.
    pub step_branch_lookahead: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from(&ParserConfig::default())
    }
}

impl From<&ParserConfig> for ParseOptions {
    fn from(config: &ParserConfig) -> Self {
        Self {
            code_branch_lookahead: config.code_branch_lookahead,
            step_branch_lookahead: config.step_branch_lookahead,
        }
    }
}

/// Runtime extraction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub parse: ParseOptions,
    pub min_content_len: usize,
    pub use_fallback_sample: bool,
    pub batch_concurrency: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExtractOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            parse: ParseOptions::from(&config.parser),
            min_content_len: config.extraction.min_content_len,
            use_fallback_sample: config.extraction.use_fallback_sample,
            batch_concurrency: config.extraction.batch_concurrency,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.flowgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FlowGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.flowgraph/flowgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FlowGraphError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FlowGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FlowGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FlowGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FlowGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the pipeline cannot run with.
fn validate(config: &AppConfig) -> Result<()> {
    if config.extraction.batch_concurrency == 0 {
        return Err(FlowGraphError::validation(
            "extraction.batch_concurrency must be at least 1",
        ));
    }
    Ok(())
}
