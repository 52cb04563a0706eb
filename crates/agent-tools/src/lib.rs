//! # agent-tools
//!
//! Built-in tools that implement `agent_core::Tool`.
//!
//! | Tool         | Effect                                       |
//! |--------------|----------------------------------------------|
//! | `file_read`  | Read a text file under the workspace         |
//! | `file_write` | Create, overwrite or append to a file        |
//! | `shell_exec` | Run a shell command with a timeout           |
//! | `web_fetch`  | GET an http(s) URL and return the body text  |
//!
//! ```rust,ignore
//! let mut registry = ToolRegistry::new();
//! agent_tools::register_builtin_tools(&mut registry, &ToolsConfig::default());
//! let registry = Arc::new(registry);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agent_core::ToolRegistry;

mod files;
mod shell;
mod web;

pub use files::{FileReadTool, FileWriteTool};
pub use shell::ShellExecTool;
pub use web::WebFetchTool;

/// Limits and locations shared by the built-in tools
#[derive(Clone, Debug)]
pub struct ToolsConfig {
    /// Base directory for relative paths and the default shell cwd
    pub workspace_root: PathBuf,

    /// Default `shell_exec` timeout
    pub shell_timeout: Duration,

    /// Upper bound on bytes returned by `file_read`
    pub max_read_bytes: usize,

    /// Upper bound on characters returned by `web_fetch`
    pub max_fetch_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            shell_timeout: Duration::from_secs(30),
            max_read_bytes: 100_000,
            max_fetch_chars: 20_000,
        }
    }
}

impl ToolsConfig {
    pub fn with_workspace(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: root.into(),
            ..Self::default()
        }
    }

    /// Absolute paths pass through; relative ones join the workspace root
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.workspace_root.join(candidate)
        }
    }
}

/// Register `file_read`, `file_write`, `shell_exec` and `web_fetch`
///
/// Registering again replaces each tool in place, so repeated calls leave
/// the catalogue unchanged.
pub fn register_builtin_tools(registry: &mut ToolRegistry, config: &ToolsConfig) {
    let config = Arc::new(config.clone());

    registry.register(FileReadTool::new(Arc::clone(&config)));
    registry.register(FileWriteTool::new(Arc::clone(&config)));
    registry.register(ShellExecTool::new(Arc::clone(&config)));
    registry.register(WebFetchTool::new(config));

    tracing::info!(tools = registry.len(), "Built-in tools registered");
}

/// Cut `text` to at most `max_chars` characters, noting the cut
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((cut, _)) => (
            format!("{}\n... [truncated after {max_chars} characters]", &text[..cut]),
            true,
        ),
    }
}
