use serde::{Deserialize, Serialize};

use crate::search::SearchType;

/// JSON-RPC 2.0 ID: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    Str(String),
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn is_initialize(&self) -> bool {
        self.method == "initialize"
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Parameters for the `list_notes` tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotesParams {
    pub content_filter: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    pub use_cache: Option<bool>,
}

/// Parameters for the `read_note` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadNoteParams {
    pub name: String,
    #[serde(default)]
    pub use_cache: bool,
}

/// Parameters for `create_note` and `update_note`.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteNoteParams {
    pub name: String,
    pub content: String,
}

/// Parameters for the `delete_note` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteNoteParams {
    pub name: String,
}

/// Parameters for the `search_notes` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchNotesParams {
    pub query: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub case_sensitive: bool,
    pub max_results: Option<usize>,
    pub page: Option<usize>,
    #[serde(default)]
    pub context_lines: usize,
    pub use_cache: Option<bool>,
}

/// MCP `initialize` params.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(rename = "clientInfo")]
    pub client_info: Option<ClientInfo>,
}

/// Client information sent during `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

/// Parameters for `resources/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}
