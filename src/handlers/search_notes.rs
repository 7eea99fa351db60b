use super::ToolContext;
use crate::error::NoteError;
use crate::protocol::{McpErrorCode, McpErrorResponse, SearchNotesParams, ToolResult};
use crate::search::{SearchError, SearchRequest};

/// Handle a `search_notes` tool call.
pub async fn handle(params: SearchNotesParams, ctx: &ToolContext) -> ToolResult {
    let request = SearchRequest {
        query: params.query,
        search_type: params.search_type,
        case_sensitive: params.case_sensitive,
        max_results: params.max_results.unwrap_or(ctx.search_page_size),
        page: params.page.unwrap_or(1),
        context_lines: params.context_lines,
        use_cache: params.use_cache.unwrap_or(true),
    };

    match ctx.search.search(&request).await {
        Ok(page) => ToolResult::json(&page),
        Err(SearchError::Store(e)) => NoteError::from(e).into(),
        Err(SearchError::Pattern(e)) => {
            McpErrorResponse::new(McpErrorCode::InvalidArguments, e.to_string()).into()
        }
    }
}
