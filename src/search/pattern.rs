//! Pattern matching behind a small interface so the literal fallback and the
//! case-sensitivity flag can be exercised without a particular regex engine.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid search pattern '{pattern}': {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

/// A compiled pattern.
pub trait PatternMatcher: Send + Sync {
    /// Number of non-empty matches in `haystack`.
    fn count_matches(&self, haystack: &str) -> usize;

    fn is_match(&self, haystack: &str) -> bool {
        self.count_matches(haystack) > 0
    }
}

/// Compiles query strings into matchers.
pub trait PatternEngine: Send + Sync {
    fn compile(
        &self,
        pattern: &str,
        case_sensitive: bool,
    ) -> Result<Box<dyn PatternMatcher>, PatternError>;

    /// Escape every metacharacter so `pattern` matches literally.
    fn escape(&self, pattern: &str) -> String;
}

/// Result of [`compile_with_fallback`].
pub struct CompiledQuery {
    pub matcher: Box<dyn PatternMatcher>,
    /// Set when the query was malformed and is being matched literally.
    pub fallback: Option<PatternError>,
}

impl CompiledQuery {
    pub fn fallback_notice(&self) -> Option<String> {
        self.fallback
            .as_ref()
            .map(|err| format!("{err}; matched as literal text instead"))
    }
}

/// Compile `query`, degrading to a literal match when it is not a valid pattern.
pub fn compile_with_fallback(
    engine: &dyn PatternEngine,
    query: &str,
    case_sensitive: bool,
) -> Result<CompiledQuery, PatternError> {
    match engine.compile(query, case_sensitive) {
        Ok(matcher) => Ok(CompiledQuery {
            matcher,
            fallback: None,
        }),
        Err(err) => {
            tracing::debug!(%err, "falling back to literal search");
            let matcher = engine.compile(&engine.escape(query), case_sensitive)?;
            Ok(CompiledQuery {
                matcher,
                fallback: Some(err),
            })
        }
    }
}

/// [`PatternEngine`] on top of the `regex` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexEngine;

struct RegexMatcher(Regex);

impl PatternMatcher for RegexMatcher {
    fn count_matches(&self, haystack: &str) -> usize {
        self.0.find_iter(haystack).filter(|m| !m.is_empty()).count()
    }
}

impl PatternEngine for RegexEngine {
    fn compile(
        &self,
        pattern: &str,
        case_sensitive: bool,
    ) -> Result<Box<dyn PatternMatcher>, PatternError> {
        RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map(|re| Box::new(RegexMatcher(re)) as Box<dyn PatternMatcher>)
            .map_err(|e| PatternError {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    fn escape(&self, pattern: &str) -> String {
        regex::escape(pattern)
    }
}
