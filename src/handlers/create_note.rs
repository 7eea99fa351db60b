use serde::Serialize;
use tracing::info;

use super::{normalize_note_name, ToolContext};
use crate::error::NoteError;
use crate::protocol::{ToolResult, WriteNoteParams};

#[derive(Debug, Serialize)]
pub(crate) struct WriteNoteResponse {
    pub(crate) name: String,
    pub(crate) status: &'static str,
    pub(crate) bytes: usize,
}

/// Handle a `create_note` tool call.
///
/// Existence is checked against a fresh listing. Two concurrent creates of
/// the same name both pass the check; the later write wins.
pub async fn handle(params: WriteNoteParams, ctx: &ToolContext) -> ToolResult {
    match create(params, ctx).await {
        Ok(resp) => ToolResult::json(&resp),
        Err(e) => e.into(),
    }
}

async fn create(params: WriteNoteParams, ctx: &ToolContext) -> Result<WriteNoteResponse, NoteError> {
    let name = normalize_note_name(&params.name);

    if ctx.find_note(&name).await?.is_some() {
        return Err(NoteError::AlreadyExists(name));
    }

    ctx.store.write(&name, &params.content).await?;
    info!(note = %name, "note created");

    Ok(WriteNoteResponse {
        name,
        status: "created",
        bytes: params.content.len(),
    })
}
