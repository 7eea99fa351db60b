//! Title and content search over the note store.
//!
//! Bodies are read through the [`ContentCache`]; a note that fails to load is
//! reported and skipped rather than failing the whole search.

pub mod pattern;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::ContentCache;
use crate::error::StoreError;
use crate::store::{NoteInfo, Permission};
use pattern::{compile_with_fallback, PatternEngine, PatternError, PatternMatcher, RegexEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Title,
    Content,
    #[default]
    Both,
}

impl SearchType {
    fn includes_title(self) -> bool {
        matches!(self, Self::Title | Self::Both)
    }

    fn includes_content(self) -> bool {
        matches!(self, Self::Content | Self::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Title,
    Content,
}

/// Inclusive, 1-based line span of a context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub kind: MatchKind,
    /// 1-based; 0 for title matches.
    pub line_number: usize,
    pub matched_text: String,
    pub match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub filename: String,
    pub permission: Permission,
    pub matches: Vec<SearchMatch>,
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: SearchType,
    pub case_sensitive: bool,
    pub max_results: usize,
    /// 1-based.
    pub page: usize,
    pub context_lines: usize,
    pub use_cache: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            search_type: SearchType::Both,
            case_sensitive: false,
            max_results: 10,
            page: 1,
            context_lines: 0,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub total_pages: usize,
    pub page: usize,
    pub max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SearchFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

pub struct SearchEngine {
    cache: Arc<ContentCache>,
    patterns: Box<dyn PatternEngine>,
}

impl SearchEngine {
    pub fn new(cache: Arc<ContentCache>) -> Self {
        Self::with_engine(cache, Box::new(RegexEngine))
    }

    pub fn with_engine(cache: Arc<ContentCache>, patterns: Box<dyn PatternEngine>) -> Self {
        Self { cache, patterns }
    }

    pub fn patterns(&self) -> &dyn PatternEngine {
        self.patterns.as_ref()
    }

    /// Run a search and return the requested page.
    ///
    /// Only a failure of the initial listing aborts the search.
    pub async fn search(&self, req: &SearchRequest) -> Result<SearchPage, SearchError> {
        let compiled = compile_with_fallback(self.patterns(), &req.query, req.case_sensitive)?;
        let notes = self.cache.store().list().await?;

        let mut results = Vec::new();
        let mut errors = Vec::new();

        for note in &notes {
            let mut matches = Vec::new();

            if req.search_type.includes_title() {
                let count = compiled.matcher.count_matches(&note.name);
                if count > 0 {
                    matches.push(SearchMatch {
                        kind: MatchKind::Title,
                        line_number: 0,
                        matched_text: note.name.clone(),
                        match_count: count,
                        context: None,
                        line_range: None,
                    });
                }
            }

            if req.search_type.includes_content() {
                match self.cache.get_content(&note.name, req.use_cache).await {
                    Ok(body) => matches.extend(content_matches(
                        compiled.matcher.as_ref(),
                        &body,
                        req.context_lines,
                    )),
                    Err(err) => {
                        // An unreadable note is dropped whole, title match included.
                        warn!(note = %note.name, %err, "skipping note during search");
                        errors.push(SearchFailure {
                            filename: note.name.clone(),
                            error: err.to_string(),
                        });
                        continue;
                    }
                }
            }

            if let Some(result) = build_result(note, matches) {
                results.push(result);
            }
        }

        // Stable: equal scores keep listing order.
        results.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(paginate(results, req.max_results, req.page, compiled.fallback_notice(), errors))
    }
}

fn build_result(note: &NoteInfo, matches: Vec<SearchMatch>) -> Option<SearchResult> {
    if matches.is_empty() {
        return None;
    }
    let score = matches.iter().map(|m| m.match_count).sum();
    Some(SearchResult {
        filename: note.name.clone(),
        permission: note.permission,
        matches,
        score,
    })
}

/// One match per line with at least one hit.
pub fn content_matches(
    matcher: &dyn PatternMatcher,
    body: &str,
    context_lines: usize,
) -> Vec<SearchMatch> {
    let lines: Vec<&str> = body.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let count = matcher.count_matches(line);
        if count == 0 {
            continue;
        }

        let (context, line_range) = if context_lines > 0 {
            let start = idx.saturating_sub(context_lines);
            let end = (idx + context_lines).min(lines.len() - 1);
            (
                Some(lines[start..=end].join("\n")),
                Some(LineRange {
                    start: start + 1,
                    end: end + 1,
                }),
            )
        } else {
            (None, None)
        };

        out.push(SearchMatch {
            kind: MatchKind::Content,
            line_number: idx + 1,
            matched_text: line.to_string(),
            match_count: count,
            context,
            line_range,
        });
    }

    out
}

/// Slice `[(page-1)*size, min(total, page*size))`; pages past the end are empty.
fn paginate(
    results: Vec<SearchResult>,
    max_results: usize,
    page: usize,
    notice: Option<String>,
    errors: Vec<SearchFailure>,
) -> SearchPage {
    let size = max_results.max(1);
    let page = page.max(1);
    let total_results = results.len();
    let total_pages = total_results.div_ceil(size);

    let start = (page - 1).saturating_mul(size);
    let results = if start >= total_results {
        Vec::new()
    } else {
        results
            .into_iter()
            .skip(start)
            .take(size)
            .collect()
    };

    SearchPage {
        results,
        total_results,
        total_pages,
        page,
        max_results: size,
        notice,
        errors,
    }
}
