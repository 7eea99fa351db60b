use tracing::info;

use super::create_note::WriteNoteResponse;
use super::{normalize_note_name, ToolContext};
use crate::error::NoteError;
use crate::protocol::{ToolResult, WriteNoteParams};

/// Handle an `update_note` tool call.
pub async fn handle(params: WriteNoteParams, ctx: &ToolContext) -> ToolResult {
    match update(params, ctx).await {
        Ok(resp) => ToolResult::json(&resp),
        Err(e) => e.into(),
    }
}

async fn update(params: WriteNoteParams, ctx: &ToolContext) -> Result<WriteNoteResponse, NoteError> {
    let name = normalize_note_name(&params.name);
    ctx.require_writable(&name).await?;

    ctx.store.write(&name, &params.content).await?;
    info!(note = %name, "note updated");

    Ok(WriteNoteResponse {
        name,
        status: "updated",
        bytes: params.content.len(),
    })
}
