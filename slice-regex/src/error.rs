/// A pattern the engine refused to compile.
///
/// Only returned by [`PatternCache::get_or_compile`](crate::PatternCache::get_or_compile).
/// Searching never fails; no match is an empty [`MatchResult`](crate::MatchResult).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid pattern `{pattern}`: {message}")]
pub struct InvalidPatternError {
    /// The pattern source.
    pub pattern: String,
    /// The engine's diagnostic.
    pub message: String,
}

impl InvalidPatternError {
    pub fn new(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
