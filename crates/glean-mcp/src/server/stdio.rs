//! Line-delimited JSON-RPC transport.
//!
//! One request per line in, one response per line out. Stdout carries nothing
//! else; logs go to stderr and the log file.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::McpServer;
use super::protocol::{JsonRpcRequest, JsonRpcResponse, codes};

/// Read requests from `reader` until EOF, writing responses to `writer`.
pub async fn serve<R, W>(reader: R, mut writer: W, server: &McpServer) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => server.handle(&request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable request");
                Some(JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {e}")))
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Input closed; MCP server stopping");
    Ok(())
}
