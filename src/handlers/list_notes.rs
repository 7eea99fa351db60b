use serde::Serialize;
use tracing::warn;

use super::ToolContext;
use crate::error::NoteError;
use crate::protocol::{ListNotesParams, McpErrorCode, McpErrorResponse, ToolResult};
use crate::search::pattern::compile_with_fallback;
use crate::search::SearchFailure;
use crate::store::NoteInfo;

#[derive(Debug, Serialize)]
struct ListNotesResponse {
    notes: Vec<NoteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<SearchFailure>,
}

/// Handle a `list_notes` tool call.
///
/// Without a filter this is a single listing call. With `content_filter`
/// each body is fetched through the content cache; a note that cannot be
/// read is reported under `errors` and left out.
pub async fn handle(params: ListNotesParams, ctx: &ToolContext) -> ToolResult {
    let notes = match ctx.store.list().await {
        Ok(notes) => notes,
        Err(e) => return NoteError::from(e).into(),
    };

    let Some(filter) = params.content_filter.filter(|f| !f.is_empty()) else {
        return ToolResult::json(&ListNotesResponse {
            notes,
            notice: None,
            errors: Vec::new(),
        });
    };

    let compiled = match compile_with_fallback(ctx.search.patterns(), &filter, params.case_sensitive) {
        Ok(c) => c,
        Err(e) => {
            return McpErrorResponse::new(McpErrorCode::InvalidArguments, e.to_string()).into();
        }
    };

    let use_cache = params.use_cache.unwrap_or(true);
    let mut kept = Vec::new();
    let mut errors = Vec::new();

    for note in notes {
        match ctx.cache.get_content(&note.name, use_cache).await {
            Ok(body) => {
                if compiled.matcher.is_match(&body) {
                    kept.push(note);
                }
            }
            Err(err) => {
                warn!(note = %note.name, %err, "skipping note in filtered listing");
                errors.push(SearchFailure {
                    filename: note.name,
                    error: err.to_string(),
                });
            }
        }
    }

    ToolResult::json(&ListNotesResponse {
        notes: kept,
        notice: compiled.fallback_notice(),
        errors,
    })
}
