pub mod collect;
pub mod enumerate;
pub mod highlight;
pub mod matcher;
pub mod navigator;
pub mod overlay;
pub mod session;

use serde::Serialize;

use crate::dom::{DomError, NodeId};

pub use collect::collect_matches;
pub use enumerate::SegmentEnumerator;
pub use highlight::{HighlightMarker, Highlighter};
pub use matcher::Matcher;
pub use navigator::{NavState, Navigator};
pub use session::SearchSession;

/// Counter text shown instead of `n/m` when the pattern does not compile.
pub const INVALID_PATTERN_TEXT: &str = "Invalid regular expression";

/// Per-search toggles. Changing either requires re-running the full pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl SearchOptions {
    pub fn with_case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    pub fn with_regex(mut self, value: bool) -> Self {
        self.use_regex = value;
        self
    }
}

/// One eligible text node, with its content snapshotted at enumeration time.
///
/// Only valid until the tree is next mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub node: NodeId,
    /// Position of this segment in document order.
    pub index: usize,
    pub content: String,
}

/// A match inside one segment. `offset` and `length` are byte counts into
/// the segment content and always fall on character boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub node: NodeId,
    pub segment_index: usize,
    pub offset: usize,
    pub length: usize,
    pub text: String,
}

impl MatchSpan {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Opaque handle to the current match, for host-side styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHandle {
    /// Position in the match list (0-based).
    pub index: usize,
    /// The marker element.
    pub node: NodeId,
}

/// A query that does not compile as a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern: {0}")]
pub struct PatternError(pub String);

/// Errors produced inside the search pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error("cannot highlight match at byte {offset} of node {node}: {source}")]
    MarkerApplication {
        node: NodeId,
        offset: usize,
        #[source]
        source: DomError,
    },
}

/// Outcome class of a search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SearchStatus {
    Ok,
    InvalidPattern(String),
}

/// What a search run reports back to the UI shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// Number of highlighted matches.
    pub count: usize,
    /// 1-based position of the current match, 0 when there is none.
    pub position: usize,
    pub status: SearchStatus,
}

impl SearchReport {
    pub fn empty() -> Self {
        Self {
            count: 0,
            position: 0,
            status: SearchStatus::Ok,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            count: 0,
            position: 0,
            status: SearchStatus::InvalidPattern(message.into()),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.status, SearchStatus::InvalidPattern(_))
    }

    /// `"n/m"`, `"0/0"`, or [`INVALID_PATTERN_TEXT`].
    pub fn counter_text(&self) -> String {
        match self.status {
            SearchStatus::InvalidPattern(_) => INVALID_PATTERN_TEXT.to_string(),
            SearchStatus::Ok => format!("{}/{}", self.position, self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_counter_is_zero_of_zero() {
        assert_eq!(SearchReport::empty().counter_text(), "0/0");
    }

    #[test]
    fn invalid_report_counter_is_distinct() {
        let report = SearchReport::invalid("unclosed character class");
        assert!(report.is_invalid());
        assert_ne!(report.counter_text(), "0/0");
        assert_eq!(report.counter_text(), INVALID_PATTERN_TEXT);
    }

    #[test]
    fn positioned_report_counter() {
        let report = SearchReport {
            count: 3,
            position: 2,
            status: SearchStatus::Ok,
        };
        assert_eq!(report.counter_text(), "2/3");
    }

    #[test]
    fn options_builders() {
        let options = SearchOptions::default()
            .with_case_sensitive(true)
            .with_regex(true);
        assert!(options.case_sensitive);
        assert!(options.use_regex);
    }

    #[test]
    fn pattern_error_converts_into_search_error() {
        let err: SearchError = PatternError("unclosed group".to_string()).into();
        assert!(matches!(err, SearchError::InvalidPattern(PatternError(ref m)) if m == "unclosed group"));
        assert_eq!(err.to_string(), "invalid pattern: unclosed group");
    }

    #[test]
    fn report_serializes_status_kind() {
        let json = serde_json::to_string(&SearchReport::invalid("bad")).unwrap();
        assert_eq!(
            json,
            r#"{"count":0,"position":0,"status":{"kind":"invalid_pattern","message":"bad"}}"#
        );
        let json = serde_json::to_string(&SearchReport::empty()).unwrap();
        assert_eq!(json, r#"{"count":0,"position":0,"status":{"kind":"ok"}}"#);
    }
}
