use serde::Serialize;
use tracing::info;

use super::{normalize_note_name, ToolContext};
use crate::error::NoteError;
use crate::protocol::{DeleteNoteParams, ToolResult};

#[derive(Debug, Serialize)]
struct DeleteNoteResponse {
    name: String,
    status: &'static str,
}

/// Handle a `delete_note` tool call.
pub async fn handle(params: DeleteNoteParams, ctx: &ToolContext) -> ToolResult {
    let name = normalize_note_name(&params.name);
    match delete(&name, ctx).await {
        Ok(()) => ToolResult::json(&DeleteNoteResponse {
            name,
            status: "deleted",
        }),
        Err(e) => e.into(),
    }
}

async fn delete(name: &str, ctx: &ToolContext) -> Result<(), NoteError> {
    ctx.require_writable(name).await?;
    ctx.store.delete(name).await?;
    info!(note = %name, "note deleted");
    Ok(())
}
