use std::sync::Arc;

use gcp_ops_core::Providers;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader};
use uuid::Uuid;

pub mod args;
pub mod catalog;
pub mod dispatch;
pub mod framing;
pub mod gate;
pub mod resolver;
pub mod results;
pub mod session;

pub use catalog::{Catalog, CatalogError, ToolName};
pub use dispatch::{Dispatcher, ToolError, ToolRequest, ToolResponse};
pub use gate::PermissionGate;
pub use resolver::{MissingProjectError, resolve_project};
pub use session::Session;

use framing::{Incoming, read_message, write_message};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "gcp-ops-mcp";

#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Project selected at startup; blank means "no active project"
    pub default_project: Option<String>,
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("tool catalog is invalid: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Failed to read MCP message: {0}")]
    Read(std::io::Error),
    #[error("Failed to write MCP response: {0}")]
    Write(std::io::Error),
}

/// Build the server and serve stdio until EOF. Returns the process exit code.
pub async fn run(config: RuntimeConfig, providers: Providers) -> i32 {
    let server = match McpServer::new(config, providers) {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(error = %err, "mcp server failed to start");
            return 1;
        }
    };
    match server.serve_stdio().await {
        Ok(()) => {
            tracing::info!(session = %server.session_id, "stdin closed, shutting down");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, session = %server.session_id, "mcp server error");
            1
        }
    }
}

pub struct McpServer {
    dispatcher: Dispatcher,
    session_id: String,
}

impl McpServer {
    pub fn new(config: RuntimeConfig, providers: Providers) -> Result<Self, CatalogError> {
        let catalog = Catalog::new()?;
        let session = Arc::new(Session::new(config.default_project));
        Ok(Self {
            dispatcher: Dispatcher::new(catalog, session, providers),
            session_id: format!("stdio-{}", Uuid::now_v7()),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn serve_stdio(&self) -> Result<(), ServeError> {
        let mut reader = BufReader::new(io::stdin());
        let mut writer = io::stdout();
        tracing::info!(
            session = %self.session_id,
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            active_project = ?self.dispatcher.session().get(),
            "mcp server listening on stdio"
        );
        self.serve(&mut reader, &mut writer).await
    }

    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<(), ServeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let Some((incoming, framing)) = read_message(reader).await.map_err(ServeError::Read)?
            else {
                break;
            };

            let responses = match incoming {
                Incoming::Message(value) => self.handle_incoming_message(value).await,
                Incoming::Malformed(reason) => {
                    tracing::warn!(session = %self.session_id, %reason, "unparseable frame");
                    vec![error_response(Value::Null, RpcError::parse_error(reason))]
                }
            };
            for response in responses {
                write_message(writer, &response, framing)
                    .await
                    .map_err(ServeError::Write)?;
            }
        }
        Ok(())
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        // Without a method this is a client response; the server never sends requests.
        let method = obj.get("method").and_then(Value::as_str)?;

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        let id = obj.get("id").cloned()?;
        let result = self.handle_request(method, params).await;
        Some(match result {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.dispatcher.catalog().to_value()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Start with list_projects and set_active_project (or pass `project` on each call). Use test_iam_identity to see which capabilities the current credentials hold. trigger_deployment only runs with approval=true after a human has confirmed the change."
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let response = self
            .dispatcher
            .handle(ToolRequest::new(name, arguments))
            .await;
        Ok(response.to_value())
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}
