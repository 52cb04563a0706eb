//! System prompt assembly

use std::path::Path;

use agent_core::reasoning::DEFAULT_SYSTEM_PROMPT;
use chrono::{DateTime, Utc};

pub fn build_system_prompt(workspace: &Path, now: DateTime<Utc>) -> String {
    format!(
        "{DEFAULT_SYSTEM_PROMPT}\n\n\
         ## Environment\n\
         - Workspace root: {}\n\
         - Relative file paths and shell commands resolve against the workspace root.\n\
         - Current date (UTC): {}",
        workspace.display(),
        now.format("%Y-%m-%d"),
    )
}
