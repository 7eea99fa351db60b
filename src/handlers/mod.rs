pub mod create_note;
pub mod delete_note;
pub mod list_notes;
pub mod read_note;
pub mod resources;
pub mod search_notes;
pub mod update_note;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cache::ContentCache;
use crate::config::ServerConfig;
use crate::error::NoteError;
use crate::protocol::{
    ClientInfo, InitializeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpErrorCode,
    McpErrorResponse, ReadResourceParams, ToolCallParams, ToolResult,
};
use crate::schema::validate_value;
use crate::search::SearchEngine;
use crate::session::Notifier;
use crate::store::{NoteInfo, NoteStore, NOTE_SUFFIX};

pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Everything a tool call needs. Shared by every session of the process.
pub struct ToolContext {
    pub store: Arc<dyn NoteStore>,
    pub cache: Arc<ContentCache>,
    pub search: SearchEngine,
    pub search_page_size: usize,
}

impl ToolContext {
    pub fn new(store: Arc<dyn NoteStore>, config: &ServerConfig) -> Self {
        Self::with_page_size(store, config.search_page_size)
    }

    pub fn with_page_size(store: Arc<dyn NoteStore>, search_page_size: usize) -> Self {
        let cache = Arc::new(ContentCache::new(store.clone()));
        Self {
            store,
            search: SearchEngine::new(cache.clone()),
            cache,
            search_page_size,
        }
    }

    /// Listing entry for `name`, if the store currently has it.
    pub async fn find_note(&self, name: &str) -> Result<Option<NoteInfo>, NoteError> {
        let notes = self.store.list().await?;
        Ok(notes.into_iter().find(|n| n.name == name))
    }

    /// Listing entry for `name`, which must exist and be writable.
    pub async fn require_writable(&self, name: &str) -> Result<NoteInfo, NoteError> {
        let note = self
            .find_note(name)
            .await?
            .ok_or_else(|| NoteError::NotFound(name.to_string()))?;
        if !note.permission.is_writable() {
            return Err(NoteError::ReadOnly(name.to_string()));
        }
        Ok(note)
    }
}

/// Trim and apply the `.md` suffix convention.
pub fn normalize_note_name(raw: &str) -> String {
    let name = raw.trim();
    if name.ends_with(NOTE_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{NOTE_SUFFIX}")
    }
}

/// Protocol handler bound to one session.
///
/// Holds the per-session conversation state; requests for one session are
/// serialized by the caller.
pub struct NoteHandler {
    ctx: Arc<ToolContext>,
    notifier: Notifier,
    initialized: bool,
    client: Option<ClientInfo>,
}

impl NoteHandler {
    pub fn new(ctx: Arc<ToolContext>, notifier: Notifier) -> Self {
        Self {
            ctx,
            notifier,
            initialized: false,
            client: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn client(&self) -> Option<&ClientInfo> {
        self.client.as_ref()
    }

    /// Handle one JSON-RPC message.
    ///
    /// Returns `None` for notifications (no response required).
    pub async fn handle(&mut self, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Validate jsonrpc version
        if req.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                req.id.clone(),
                JsonRpcError::invalid_request(),
            ));
        }

        // Initialization gate: only `initialize` is allowed before handshake completes
        if !self.initialized && !req.is_initialize() {
            if req.is_notification() {
                return None;
            }
            return Some(JsonRpcResponse::error(
                req.id.clone(),
                JsonRpcError::invalid_request_with("Server not initialized"),
            ));
        }

        let resp = self.dispatch(req).await;

        if req.is_initialize() && resp.as_ref().is_some_and(|r| !r.is_error()) {
            self.initialized = true;
        }
        resp
    }

    async fn dispatch(&mut self, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %req.method, "dispatching request");
        match req.method.as_str() {
            "initialize" => {
                if let Some(params) = &req.params {
                    match serde_json::from_value::<InitializeParams>(params.clone()) {
                        Ok(p) => self.client = p.client_info,
                        Err(e) => {
                            return Some(JsonRpcResponse::error(
                                req.id.clone(),
                                JsonRpcError::invalid_params(format!(
                                    "Invalid initialize params: {e}"
                                )),
                            ));
                        }
                    }
                }
                let result = json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {},
                        "resources": { "listChanged": true }
                    },
                    "serverInfo": {
                        "name": "mcp-note-bridge",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                });
                Some(JsonRpcResponse::success(req.id.clone(), result))
            }

            method if req.is_notification() && method.starts_with("notifications/") => None,

            "ping" => Some(JsonRpcResponse::success(req.id.clone(), json!({}))),

            "tools/list" => Some(JsonRpcResponse::success(
                req.id.clone(),
                json!({ "tools": tool_definitions() }),
            )),

            "tools/call" => {
                let params: ToolCallParams = match parse_params(req, "tools/call") {
                    Ok(p) => p,
                    Err(resp) => return Some(resp),
                };

                let tool_result = self.call_tool(&params).await;
                let result_json = serde_json::to_value(&tool_result).unwrap_or_else(|e| {
                    warn!("ToolResult serialization failed: {e}");
                    json!({ "content": [], "isError": true })
                });
                Some(JsonRpcResponse::success(req.id.clone(), result_json))
            }

            "resources/list" => Some(match resources::list(&self.ctx).await {
                Ok(result) => JsonRpcResponse::success(req.id.clone(), result),
                Err(err) => JsonRpcResponse::error(req.id.clone(), err),
            }),

            "resources/read" => {
                let params: ReadResourceParams = match parse_params(req, "resources/read") {
                    Ok(p) => p,
                    Err(resp) => return Some(resp),
                };
                Some(match resources::read(params, &self.ctx).await {
                    Ok(result) => JsonRpcResponse::success(req.id.clone(), result),
                    Err(err) => JsonRpcResponse::error(req.id.clone(), err),
                })
            }

            _ => Some(JsonRpcResponse::error(
                req.id.clone(),
                JsonRpcError::method_not_found(&req.method),
            )),
        }
    }

    /// Run one tool to completion. Store calls carry no deadline of their own.
    async fn call_tool(&self, params: &ToolCallParams) -> ToolResult {
        let result = dispatch_tool_call(params, &self.ctx).await;
        if !result.is_error && changes_note_set(&params.name) {
            self.notifier
                .notify("notifications/resources/list_changed", None);
        }
        result
    }
}

fn changes_note_set(tool: &str) -> bool {
    matches!(tool, "create_note" | "delete_note")
}

fn parse_params<T: DeserializeOwned>(
    req: &JsonRpcRequest,
    method: &str,
) -> Result<T, JsonRpcResponse> {
    match &req.params {
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
            JsonRpcResponse::error(
                req.id.clone(),
                JsonRpcError::invalid_params(format!("Invalid {method} params: {e}")),
            )
        }),
        None => Err(JsonRpcResponse::error(
            req.id.clone(),
            JsonRpcError::invalid_params(format!("Missing params for {method}")),
        )),
    }
}

/// Validate arguments against the tool's schema, then deserialize them.
fn parse_arguments<T: DeserializeOwned>(tool: &str, schema: &Value, args: &Value) -> Result<T, ToolResult> {
    if let Err(e) = validate_value(schema, args) {
        return Err(McpErrorResponse::new(
            McpErrorCode::InvalidArguments,
            format!("Invalid arguments for {tool}: {e}"),
        )
        .into());
    }
    serde_json::from_value(args.clone()).map_err(|e| {
        McpErrorResponse::new(
            McpErrorCode::InvalidArguments,
            format!("Invalid arguments for {tool}: {e}"),
        )
        .into()
    })
}

/// Dispatch a `tools/call` to the named tool.
pub async fn dispatch_tool_call(params: &ToolCallParams, ctx: &ToolContext) -> ToolResult {
    let Some(schema) = tool_schema(&params.name) else {
        return unknown_tool(&params.name);
    };
    let args = params.arguments.clone().unwrap_or_else(|| json!({}));

    macro_rules! run {
        ($module:ident) => {
            match parse_arguments(&params.name, &schema, &args) {
                Ok(p) => $module::handle(p, ctx).await,
                Err(err) => err,
            }
        };
    }

    match params.name.as_str() {
        "list_notes" => run!(list_notes),
        "read_note" => run!(read_note),
        "create_note" => run!(create_note),
        "update_note" => run!(update_note),
        "delete_note" => run!(delete_note),
        "search_notes" => run!(search_notes),
        _ => unknown_tool(&params.name),
    }
}

fn unknown_tool(name: &str) -> ToolResult {
    McpErrorResponse::new(McpErrorCode::InvalidArguments, format!("Unknown tool: {name}")).into()
}

fn tool_schema(name: &str) -> Option<Value> {
    tool_definitions()
        .into_iter()
        .find(|tool| tool["name"] == name)
        .map(|tool| tool["inputSchema"].clone())
}

/// Tool descriptors advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    let name_prop = json!({
        "type": "string",
        "minLength": 1,
        "description": "Note name; the .md suffix is added when missing"
    });

    vec![
        json!({
            "name": "list_notes",
            "description": "List notes in the store, optionally only those whose content matches a pattern",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "content_filter": {
                        "type": "string",
                        "description": "Regular expression matched against note bodies; invalid patterns match literally"
                    },
                    "case_sensitive": { "type": "boolean", "default": false },
                    "use_cache": { "type": "boolean", "default": true }
                }
            }
        }),
        json!({
            "name": "read_note",
            "description": "Read the markdown content of a note",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "required": ["name"],
                "properties": {
                    "name": name_prop,
                    "use_cache": {
                        "type": "boolean",
                        "default": false,
                        "description": "Serve from the content cache when the note is unchanged"
                    }
                }
            }
        }),
        json!({
            "name": "create_note",
            "description": "Create a new note; fails if a note with that name exists",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "required": ["name", "content"],
                "properties": {
                    "name": name_prop,
                    "content": { "type": "string" }
                }
            }
        }),
        json!({
            "name": "update_note",
            "description": "Replace the content of an existing, writable note",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "required": ["name", "content"],
                "properties": {
                    "name": name_prop,
                    "content": { "type": "string" }
                }
            }
        }),
        json!({
            "name": "delete_note",
            "description": "Delete an existing, writable note",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "required": ["name"],
                "properties": {
                    "name": name_prop
                }
            }
        }),
        json!({
            "name": "search_notes",
            "description": "Search note titles and/or content; results are ranked by match count and paginated",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Regular expression; invalid patterns match literally"
                    },
                    "search_type": {
                        "type": "string",
                        "enum": ["title", "content", "both"],
                        "default": "both"
                    },
                    "case_sensitive": { "type": "boolean", "default": false },
                    "max_results": { "type": "integer", "minimum": 1, "description": "Results per page" },
                    "page": { "type": "integer", "minimum": 1, "default": 1 },
                    "context_lines": { "type": "integer", "minimum": 0, "default": 0 },
                    "use_cache": { "type": "boolean", "default": true }
                }
            }
        }),
    ]
}
