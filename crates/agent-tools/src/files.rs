//! File Tools
//!
//! `file_read` and `file_write`, both rooted at the workspace directory.

use std::sync::Arc;

use agent_core::{
    AgentError, Result, Tool, ToolResult, ToolSchema, parse_input, tool::ParameterSchema,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

use crate::ToolsConfig;

/// Bytes `file_read` will scan while looking for the requested lines
const MAX_SCAN_BYTES: u64 = 64 * 1024 * 1024;

/// Read a text file, optionally a window of lines
pub struct FileReadTool {
    config: Arc<ToolsConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadParams {
    file_path: String,
    /// 1-based first line
    offset: Option<usize>,
    /// Maximum number of lines
    limit: Option<usize>,
}

impl FileReadTool {
    pub const fn new(config: Arc<ToolsConfig>) -> Self {
        Self { config }
    }

    /// Read the requested window, holding at most `max_bytes + 1` bytes
    async fn read_window<R>(
        reader: &mut R,
        offset: Option<usize>,
        limit: Option<usize>,
        max_bytes: usize,
    ) -> std::io::Result<Vec<u8>>
    where
        R: AsyncBufRead + Unpin,
    {
        for _ in 1..offset.unwrap_or(1) {
            if !skip_line(reader).await? {
                return Ok(Vec::new());
            }
        }

        let budget = max_bytes as u64 + 1;
        let mut out = Vec::new();
        match limit {
            None => {
                reader.take(budget).read_to_end(&mut out).await?;
            }
            Some(lines) => {
                for _ in 0..lines {
                    let room = budget - out.len() as u64;
                    if room == 0 {
                        break;
                    }
                    let read = (&mut *reader).take(room).read_until(b'\n', &mut out).await?;
                    if read == 0 {
                        break;
                    }
                }
            }
        }
        Ok(out)
    }

    fn render(raw: &[u8], windowed: bool, max_bytes: usize) -> String {
        let text = String::from_utf8_lossy(&raw[..raw.len().min(max_bytes)]);
        let mut out = if windowed {
            text.lines().collect::<Vec<_>>().join("\n")
        } else {
            text.into_owned()
        };
        if raw.len() > max_bytes {
            out.push_str(&format!("\n... [truncated at {max_bytes} bytes]"));
        }
        out
    }
}

/// Consume one line without keeping it; `false` at end of input
async fn skip_line<R>(reader: &mut R) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(false);
        }
        if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            reader.consume(pos + 1);
            return Ok(true);
        }
        let len = buf.len();
        reader.consume(len);
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "file_read".into(),
            description: "Read a text file. Relative paths resolve against the workspace. \
                          Use offset/limit to read a range of lines from large files."
                .into(),
            parameters: vec![
                ParameterSchema::required("filePath", "string", "Path of the file to read"),
                ParameterSchema::optional("offset", "integer", "1-based line to start from"),
                ParameterSchema::optional("limit", "integer", "Maximum number of lines to return"),
            ],
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let params: ReadParams = parse_input(input)?;
        let path = self.config.resolve_path(&params.file_path);

        let io_err =
            |e: std::io::Error| AgentError::ToolExecution(format!("cannot read {}: {e}", path.display()));
        let max_bytes = self.config.max_read_bytes;

        let file = tokio::fs::File::open(&path).await.map_err(io_err)?;
        let size = file.metadata().await.map_err(io_err)?.len();
        let mut reader = BufReader::new(file.take(MAX_SCAN_BYTES));
        let raw = Self::read_window(&mut reader, params.offset, params.limit, max_bytes)
            .await
            .map_err(io_err)?;

        let windowed = params.offset.is_some() || params.limit.is_some();
        let truncated = raw.len() > max_bytes;
        let output = Self::render(&raw, windowed, max_bytes);

        tracing::debug!(path = %path.display(), size, read = raw.len(), truncated, "file_read");
        Ok(ToolResult::text(output).with_details(json!({
            "path": path.display().to_string(),
            "sizeBytes": size,
            "truncated": truncated,
        })))
    }
}

/// Create, overwrite or append to a file
pub struct FileWriteTool {
    config: Arc<ToolsConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteParams {
    file_path: String,
    content: String,
    #[serde(default)]
    append: bool,
}

impl FileWriteTool {
    pub const fn new(config: Arc<ToolsConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "file_write".into(),
            description: "Write text to a file, creating parent directories as needed. \
                          Overwrites by default; set append to add to the end instead."
                .into(),
            parameters: vec![
                ParameterSchema::required("filePath", "string", "Path of the file to write"),
                ParameterSchema::required("content", "string", "Text to write"),
                ParameterSchema::optional("append", "boolean", "Append instead of overwrite")
                    .with_default(json!(false)),
            ],
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let params: WriteParams = parse_input(input)?;
        let path = self.config.resolve_path(&params.file_path);
        let io_err =
            |e: std::io::Error| AgentError::ToolExecution(format!("cannot write {}: {e}", path.display()));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(params.append)
            .truncate(!params.append)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(params.content.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        tracing::info!(path = %path.display(), bytes = params.content.len(), append = params.append, "file_write");
        Ok(ToolResult::structured(json!({
            "path": path.display().to_string(),
            "bytesWritten": params.content.len(),
            "appended": params.append,
        })))
    }
}
