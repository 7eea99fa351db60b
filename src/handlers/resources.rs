use serde_json::{json, Value};

use super::ToolContext;
use crate::error::NoteError;
use crate::protocol::{JsonRpcError, McpErrorResponse, ReadResourceParams};

const URI_PREFIX: &str = "note:///";

pub fn note_uri(name: &str) -> String {
    format!("{URI_PREFIX}{name}")
}

/// `resources/list`: every note as a markdown resource.
pub async fn list(ctx: &ToolContext) -> Result<Value, JsonRpcError> {
    let notes = ctx
        .store
        .list()
        .await
        .map_err(|e| JsonRpcError::from(McpErrorResponse::from(&NoteError::from(e))))?;

    let resources: Vec<Value> = notes
        .iter()
        .map(|note| {
            json!({
                "uri": note_uri(&note.name),
                "name": note.name,
                "mimeType": "text/markdown"
            })
        })
        .collect();

    Ok(json!({ "resources": resources }))
}

/// `resources/read`: body through the content cache.
pub async fn read(params: ReadResourceParams, ctx: &ToolContext) -> Result<Value, JsonRpcError> {
    let name = params
        .uri
        .strip_prefix(URI_PREFIX)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| JsonRpcError::invalid_params(format!("Unsupported resource URI: {}", params.uri)))?;

    let content = ctx
        .cache
        .get_content(name, true)
        .await
        .map_err(|e| JsonRpcError::from(McpErrorResponse::from(&e)))?;

    Ok(json!({
        "contents": [{
            "uri": params.uri,
            "mimeType": "text/markdown",
            "text": content
        }]
    }))
}
