use crate::config::types::{Config, HighlightConfig};
use crate::dom::Document;

use super::{
    collect_matches, HighlightMarker, Highlighter, MatchHandle, Matcher, Navigator, PatternError,
    SearchOptions, SearchReport, SearchStatus, SegmentEnumerator,
};

/// Mutable state of one activation. Dropped on deactivation.
#[derive(Debug)]
struct SessionState {
    query: String,
    options: SearchOptions,
    highlighter: Highlighter,
    navigator: Navigator,
    status: SearchStatus,
}

/// One search surface over a document.
///
/// Owns all cross-call search state. Nothing from a previous run is reused
/// except the tracked markers, which are unwound before every new run.
#[derive(Debug)]
pub struct SearchSession {
    enumerator: SegmentEnumerator,
    highlight: HighlightConfig,
    default_options: SearchOptions,
    state: Option<SessionState>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl SearchSession {
    pub fn new(config: &Config) -> Self {
        Self {
            enumerator: SegmentEnumerator::new(&config.enumerate, &config.highlight),
            highlight: config.highlight.clone(),
            default_options: config.search.options(),
            state: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Begin a session. No-op when already active.
    pub fn activate(&mut self) {
        if self.state.is_some() {
            return;
        }
        log::debug!("Search session activated");
        self.state = Some(SessionState {
            query: String::new(),
            options: self.default_options,
            highlighter: Highlighter::new(&self.highlight),
            navigator: Navigator::new(self.highlight.current_class.clone()),
            status: SearchStatus::Ok,
        });
    }

    /// End the session, removing every marker and dropping all state.
    /// The last options are kept for the next activation.
    pub fn deactivate(&mut self, doc: &mut Document) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        state.navigator.clear(doc);
        let removed = state.highlighter.clear(doc);
        self.default_options = state.options;
        log::debug!("Search session deactivated, removed {removed} highlights");
    }

    /// Unwind the previous run, then search `doc` for `query` and highlight
    /// every match. Activates the session if needed.
    pub fn run_search(
        &mut self,
        doc: &mut Document,
        query: &str,
        options: SearchOptions,
    ) -> SearchReport {
        self.activate();
        let Some(state) = self.state.as_mut() else {
            return SearchReport::empty();
        };

        state.navigator.clear(doc);
        state.highlighter.clear(doc);
        state.query = query.to_string();
        state.options = options;
        state.status = SearchStatus::Ok;

        if query.is_empty() {
            return self.report();
        }

        let matcher = match Matcher::new(query, options) {
            Ok(matcher) => matcher,
            Err(PatternError(message)) => {
                log::debug!("Invalid pattern {query:?}: {message}");
                state.status = SearchStatus::InvalidPattern(message);
                return self.report();
            }
        };

        let spans = collect_matches(self.enumerator.segments(doc, doc.body()), &matcher);
        let markers = state.highlighter.apply(doc, &spans);
        if markers.len() < spans.len() {
            log::warn!(
                "Highlighted {} of {} matches for {query:?}",
                markers.len(),
                spans.len()
            );
        }
        state.navigator.reset(doc, markers);

        let report = self.report();
        log::debug!("Search {query:?}: {}", report.counter_text());
        report
    }

    /// Move to the next match, wrapping around.
    pub fn next(&mut self, doc: &mut Document) -> Option<MatchHandle> {
        self.state.as_mut()?.navigator.next(doc)
    }

    /// Move to the previous match, wrapping around.
    pub fn prev(&mut self, doc: &mut Document) -> Option<MatchHandle> {
        self.state.as_mut()?.navigator.prev(doc)
    }

    pub fn current(&self) -> Option<MatchHandle> {
        self.state.as_ref()?.navigator.current()
    }

    /// Markers of the last run, in document order.
    pub fn markers(&self) -> &[HighlightMarker] {
        match &self.state {
            Some(state) => state.navigator.markers(),
            None => &[],
        }
    }

    pub fn has_matches(&self) -> bool {
        !self.markers().is_empty()
    }

    /// Counter and status for the current state.
    pub fn report(&self) -> SearchReport {
        let Some(state) = &self.state else {
            return SearchReport::empty();
        };
        if let SearchStatus::InvalidPattern(message) = &state.status {
            return SearchReport::invalid(message.clone());
        }
        SearchReport {
            count: state.navigator.len(),
            position: state.navigator.cursor().map_or(0, |c| c + 1),
            status: SearchStatus::Ok,
        }
    }

    pub fn query(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.query.as_str())
    }

    pub fn options(&self) -> SearchOptions {
        self.state
            .as_ref()
            .map_or(self.default_options, |s| s.options)
    }

    /// Replace the options, re-running the current query when there is one.
    pub fn set_options(&mut self, doc: &mut Document, options: SearchOptions) -> SearchReport {
        let Some(state) = self.state.as_mut() else {
            self.default_options = options;
            return SearchReport::empty();
        };
        if state.query.is_empty() {
            state.options = options;
            return self.report();
        }
        let query = state.query.clone();
        self.run_search(doc, &query, options)
    }

    pub fn toggle_case_sensitive(&mut self, doc: &mut Document) -> SearchReport {
        let options = self.options();
        self.set_options(doc, options.with_case_sensitive(!options.case_sensitive))
    }

    pub fn toggle_regex(&mut self, doc: &mut Document) -> SearchReport {
        let options = self.options();
        self.set_options(doc, options.with_regex(!options.use_regex))
    }
}
