use serde::Serialize;

use super::{normalize_note_name, ToolContext};
use crate::error::NoteError;
use crate::protocol::{ReadNoteParams, ToolResult};

#[derive(Debug, Serialize)]
struct ReadNoteResponse {
    name: String,
    content: String,
}

/// Handle a `read_note` tool call.
///
/// A direct store read unless the caller opts into the content cache.
pub async fn handle(params: ReadNoteParams, ctx: &ToolContext) -> ToolResult {
    let name = normalize_note_name(&params.name);

    match ctx.cache.get_content(&name, params.use_cache).await {
        Ok(content) => ToolResult::json(&ReadNoteResponse { name, content }),
        Err(NoteError::Store(e)) if e.status() == Some(404) => NoteError::NotFound(name).into(),
        Err(e) => e.into(),
    }
}
