//! Interactive loop: one independent run per input line.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::cli::RunFlags;
use crate::runner::execute_run;
use crate::state::AppState;

/// Read lines until EOF, `exit` or `quit`; run errors are printed, not fatal
pub async fn run_repl<R, W>(
    state: &AppState,
    flags: &RunFlags,
    input: R,
    out: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match execute_run(state, flags.request(line)).await {
            Ok(response) => {
                for call in &response.tool_calls {
                    let status = if call.result.is_error() { "failed" } else { "ok" };
                    writeln!(out, "  [{}] {status}", call.name)?;
                }
                writeln!(out, "{}\n", response.reply)?;
            }
            Err(e) => {
                tracing::debug!(error = %e, "REPL run failed");
                writeln!(out, "Error: {}\n", e.user_message())?;
            }
        }
    }
    Ok(())
}
