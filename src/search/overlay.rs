use serde::Serialize;

use super::SearchSession;

/// What a search bar shows for the current session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchBarView {
    pub query: String,
    /// `"n/m"`, `"0/0"`, or the invalid-pattern text.
    pub counter: String,
    /// True when the counter should be drawn in the error style.
    pub has_error: bool,
    /// Whether the prev/next buttons are enabled.
    pub nav_enabled: bool,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

/// Build the search bar view for `session`.
pub fn search_bar_view(session: &SearchSession) -> SearchBarView {
    let report = session.report();
    let options = session.options();
    SearchBarView {
        query: session.query().to_string(),
        counter: report.counter_text(),
        has_error: report.is_invalid(),
        nav_enabled: session.has_matches(),
        case_sensitive: options.case_sensitive,
        use_regex: options.use_regex,
    }
}

impl SearchBarView {
    /// Lay the bar out as one line of `columns` characters: toggle flags and
    /// query on the left, counter right-aligned. The query is truncated to
    /// keep the counter visible.
    pub fn render_line(&self, columns: usize) -> String {
        let flags = format!(
            "[{}{}] ",
            if self.case_sensitive { 'C' } else { '-' },
            if self.use_regex { 'R' } else { '-' },
        );
        let counter_len = self.counter.chars().count();
        if columns <= counter_len {
            return self.counter.chars().take(columns).collect();
        }

        let left_room = columns - counter_len - 1;
        let mut line: String = flags
            .chars()
            .chain(self.query.chars())
            .take(left_room)
            .collect();
        let used = line.chars().count();
        line.extend(std::iter::repeat(' ').take(columns - counter_len - used));
        line.push_str(&self.counter);
        line
    }
}
