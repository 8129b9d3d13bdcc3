use std::borrow::Cow;
use std::ops::Range;

use regex::{Regex, RegexBuilder};

use super::{PatternError, SearchOptions};

/// A compiled query, ready to run against segment text.
///
/// Literal queries are escaped before compilation, so `a.b` only matches
/// the three characters `a.b`. Zero-length matches are never reported,
/// which makes anchor-only patterns such as `^` or `\b` match nothing.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Option<Regex>,
}

impl Matcher {
    /// Compile `query` under `options`. An empty query compiles to a matcher
    /// that finds nothing; an invalid pattern is a [`PatternError`].
    pub fn new(query: &str, options: SearchOptions) -> Result<Self, PatternError> {
        if query.is_empty() {
            return Ok(Self { regex: None });
        }

        let pattern = if options.use_regex {
            Cow::Borrowed(query)
        } else {
            Cow::Owned(regex::escape(query))
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|e| PatternError(e.to_string()))?;

        Ok(Self { regex: Some(regex) })
    }

    /// True when this matcher can never produce a match (empty query).
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    /// Byte ranges of every non-overlapping, non-empty match in `text`, in
    /// ascending order. Scanning resumes at the end of the previous match.
    pub fn find_all(&self, text: &str) -> Vec<Range<usize>> {
        let Some(regex) = &self.regex else {
            return Vec::new();
        };
        regex
            .find_iter(text)
            .filter(|m| m.start() < m.end())
            .map(|m| m.start()..m.end())
            .collect()
    }
}

/// One-shot helper: compile `query` and run it over `text`.
pub fn find_matches(
    text: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<Range<usize>>, PatternError> {
    Ok(Matcher::new(query, options)?.find_all(text))
}
