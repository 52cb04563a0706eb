//! rust-agent command-line host
//!
//! ```text
//! agent ask "summarize README.md" [--provider ollama] [--dry-run]
//! agent repl [--model gpt-4o-mini]
//! agent serve [--bind 127.0.0.1:3000] [--allow-origin http://localhost:5173]
//! ```

mod cli;
mod handlers;
mod prompt;
mod repl;
mod runner;
mod state;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::ToolRegistry;
use agent_runtime::RuntimeSettings;
use agent_tools::{ToolsConfig, register_builtin_tools};

use crate::cli::{Cli, Command, RunFlags};
use crate::runner::execute_run;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let state = bootstrap(cli.workspace)?;

    match cli.command {
        Command::Ask { message, flags } => ask(&state, &flags, message).await,
        Command::Repl { flags } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            repl::run_repl(&state, &flags, stdin, &mut std::io::stdout()).await?;
            Ok(())
        }
        Command::Serve {
            bind,
            allow_origins,
        } => serve(state, &bind, &allow_origins).await,
    }
}

/// Settings and the tool registry, built once per process
fn bootstrap(workspace: Option<PathBuf>) -> anyhow::Result<AppState> {
    let settings = RuntimeSettings::from_env().context("invalid agent settings")?;
    tracing::debug!(?settings, "Runtime settings loaded");

    let workspace = match workspace {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("workspace {} is not accessible", workspace.display()))?;

    let mut tools = ToolRegistry::new();
    register_builtin_tools(&mut tools, &ToolsConfig::with_workspace(&workspace));
    tracing::info!(workspace = %workspace.display(), tools = ?tools.names(), "Agent ready");

    Ok(AppState::new(settings, Arc::new(tools), workspace))
}

async fn ask(state: &AppState, flags: &RunFlags, message: String) -> anyhow::Result<()> {
    match execute_run(state, flags.request(message)).await {
        Ok(response) => {
            for call in &response.tool_calls {
                let status = if call.result.is_error() { "failed" } else { "ok" };
                eprintln!("[{}] {status}", call.name);
            }
            println!("{}", response.reply);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Run failed");
            anyhow::bail!(e.user_message())
        }
    }
}

async fn serve(state: AppState, bind: &str, allow_origins: &[String]) -> anyhow::Result<()> {
    let origins = handlers::cors_origins(allow_origins).map_err(anyhow::Error::msg)?;
    if origins.is_empty() {
        tracing::debug!("No CORS origins configured; cross-origin browser requests are refused");
    }
    let app = handlers::router(state, origins);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot bind {bind}"))?;

    tracing::info!("rust-agent server listening on http://{bind}");
    tracing::info!("  GET  /health     - Health check");
    tracing::info!("  GET  /api/tools  - Tool catalogue");
    tracing::info!("  POST /api/run    - Run the agent");

    axum::serve(listener, app).await?;
    Ok(())
}
