pub mod request;
pub mod response;

pub use request::{
    ClientInfo, DeleteNoteParams, InitializeParams, JsonRpcRequest, ListNotesParams,
    ReadNoteParams, ReadResourceParams, RpcId, SearchNotesParams, ToolCallParams,
    WriteNoteParams,
};
pub use response::{
    JsonRpcError, JsonRpcResponse, McpError, McpErrorCode, McpErrorResponse, ToolResult,
    ToolResultContent,
};
