//! Command-line definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::runner::RunRequest;

#[derive(Parser, Debug)]
#[command(name = "agent")]
#[command(version)]
#[command(about = "Tool-using AI agent: one-shot, interactive or over HTTP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Workspace root for file and shell tools (defaults to the current directory).
    #[arg(long, global = true, env = "AGENT_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the agent once and print the reply.
    Ask {
        /// The user message.
        message: String,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Read messages from stdin, one run per line.
    Repl {
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Serve the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
        bind: String,

        /// Browser origins allowed to call the API (comma separated).
        #[arg(long = "allow-origin", env = "AGENT_CORS_ORIGINS", value_delimiter = ',')]
        allow_origins: Vec<String>,
    },
}

/// Per-run overrides shared by `ask` and `repl`
#[derive(Args, Debug, Clone, Default)]
pub struct RunFlags {
    /// Provider to use (anthropic, openai, ollama).
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name override.
    #[arg(long)]
    pub model: Option<String>,

    /// Show requested tool calls without executing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum model rounds per run.
    #[arg(long)]
    pub max_rounds: Option<usize>,
}

impl RunFlags {
    pub fn request(&self, message: impl Into<String>) -> RunRequest {
        RunRequest {
            message: message.into(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            dry_run: Some(self.dry_run),
            max_rounds: self.max_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "agent",
            "ask",
            "list the files",
            "--provider",
            "ollama",
            "--dry-run",
            "--max-rounds",
            "3",
            "--workspace",
            "/tmp/ws",
        ])
        .unwrap();

        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
        let Command::Ask { message, flags } = cli.command else {
            panic!("expected ask");
        };
        let request = flags.request(message);
        assert_eq!(request.message, "list the files");
        assert_eq!(request.provider.as_deref(), Some("ollama"));
        assert_eq!(request.dry_run, Some(true));
        assert_eq!(request.max_rounds, Some(3));
    }

    #[test]
    fn test_parse_serve_and_repl() {
        let cli = Cli::try_parse_from([
            "agent",
            "serve",
            "--bind",
            "127.0.0.1:8080",
            "--allow-origin",
            "http://localhost:5173,https://app.example",
        ])
        .unwrap();
        let Command::Serve { bind, allow_origins } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(bind, "127.0.0.1:8080");
        assert_eq!(allow_origins, ["http://localhost:5173", "https://app.example"]);

        let cli = Cli::try_parse_from(["agent", "repl", "--model", "gpt-4o-mini"]).unwrap();
        assert!(matches!(cli.command, Command::Repl { ref flags } if flags.model.is_some()));
    }

    #[test]
    fn test_serve_defaults_to_loopback() {
        // Ambient overrides would mask the defaults
        if std::env::var_os("BIND_ADDR").is_some()
            || std::env::var_os("AGENT_CORS_ORIGINS").is_some()
        {
            return;
        }
        let cli = Cli::try_parse_from(["agent", "serve"]).unwrap();
        let Command::Serve { bind, allow_origins } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(bind, "127.0.0.1:3000");
        assert!(allow_origins.is_empty());
    }

    #[test]
    fn test_ask_requires_message() {
        assert!(Cli::try_parse_from(["agent", "ask"]).is_err());
    }
}
