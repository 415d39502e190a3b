use std::sync::Arc;

use anyhow::{Context, Result};
use dizi_core::settings::Server;
use dizi_core::{ProjectTools, ToolOutput};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::protocol::{
    CallToolParams, Request, Response, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};

/// Serves the project tools over line delimited JSON-RPC.
pub struct StdioServer {
    tools: ProjectTools,
    info: Server,
}

impl StdioServer {
    pub fn new(tools: ProjectTools, info: Server) -> Self {
        Self { tools, info }
    }

    /// Reads requests until `reader` hits EOF. Each request runs on its own
    /// task; a single writer task owns `writer` so responses never interleave.
    ///
    /// A line that is not UTF-8 is answered with a parse error. A failing
    /// reader still lets in-flight requests finish and flush before the error
    /// is returned.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

        let writer_task = tokio::spawn(async move {
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            anyhow::Ok(())
        });

        let mut requests = JoinSet::new();
        let mut buf = Vec::new();
        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']).to_owned(),
                Err(e) => {
                    warn!(?e, "Request is not valid UTF-8");
                    let response =
                        Response::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
                    if tx.send(response).is_err() {
                        warn!("Response writer closed, dropping response");
                    }
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let server = Arc::clone(&self);
            let tx = tx.clone();
            requests.spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    if tx.send(response).is_err() {
                        warn!("Response writer closed, dropping response");
                    }
                }
            });

            while let Some(finished) = requests.try_join_next() {
                log_join(finished);
            }
        };

        if let Err(e) = &read_result {
            error!(?e, "Reading requests failed, finishing in-flight requests");
        }
        debug!("Input closed, waiting for in-flight requests");
        while let Some(finished) = requests.join_next().await {
            log_join(finished);
        }
        drop(tx);

        writer_task.await??;
        read_result.context("Failed to read request")
    }

    /// Handles one raw input line. `None` means nothing should be written back.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(?e, "Malformed request");
                return Some(Response::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(Response::failure(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {e}"),
            )),
        }
    }

    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "Ignoring notification");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => Response::success(id, self.initialize_result()),
            "ping" => Response::success(id, json!({})),
            "tools/list" => Response::success(
                id,
                json!({ "tools": ProjectTools::definitions() }),
            ),
            "tools/call" => match serde_json::from_value::<CallToolParams>(request.params) {
                Ok(params) => {
                    info!(tool_name = %params.name, "Tool call");
                    let output = self.tools.call(&params.name, params.arguments).await;
                    Response::success(id, call_result(output))
                }
                Err(e) => Response::failure(id, INVALID_PARAMS, format!("Invalid params: {e}")),
            },
            other => Response::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version,
            },
            "capabilities": { "tools": {} },
            "instructions": self.info.description,
        })
    }
}

fn call_result(output: ToolOutput) -> Value {
    let mut result = json!({
        "content": [{ "type": "text", "text": output.content }],
        "isError": output.is_error,
    });
    if let Some(structured) = output.structured {
        // structuredContent must be an object.
        let structured = match structured {
            Value::Object(_) => structured,
            other => json!({ "results": other }),
        };
        result["structuredContent"] = structured;
    }
    result
}

fn log_join(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(?e, "Request task failed");
    }
}
