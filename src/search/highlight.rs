use crate::config::types::HighlightConfig;
use crate::dom::{DomError, Document, NodeId};

use super::{MatchSpan, SearchError};

/// A marker element wrapping exactly one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightMarker {
    pub node: NodeId,
    /// Position in the document-ordered match list.
    pub ordinal: usize,
    pub text: String,
}

/// Wraps matches in marker elements and restores the tree afterwards.
///
/// Every marker it inserts and every text fragment it splits off is tracked,
/// so [`Highlighter::clear`] can put back the exact pre-search structure.
#[derive(Debug)]
pub struct Highlighter {
    tag: String,
    class: String,
    markers: Vec<NodeId>,
    fragments: Vec<NodeId>,
}

impl Highlighter {
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            tag: config.tag.clone(),
            class: config.class.clone(),
            markers: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// Number of markers currently tracked.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.fragments.is_empty()
    }

    /// Wrap each span in a marker and return the markers in document order.
    ///
    /// `spans` must be in document order and fresh from the current tree.
    /// They are processed back-to-front so wrapping one never shifts the
    /// offsets of a span still pending in the same text node. A span that
    /// cannot be wrapped is skipped.
    ///
    /// Ordinals count from zero within this call. Markers from an earlier
    /// call stay tracked, and the next [`Highlighter::clear`] removes both.
    pub fn apply(&mut self, doc: &mut Document, spans: &[MatchSpan]) -> Vec<HighlightMarker> {
        let mut applied = Vec::with_capacity(spans.len());
        for span in spans.iter().rev() {
            match self.wrap_span(doc, span) {
                Ok(marker) => applied.push((marker, span.text.clone())),
                Err(e) => log::debug!("Skipping match: {e}"),
            }
        }
        applied.reverse();

        let markers: Vec<HighlightMarker> = applied
            .into_iter()
            .enumerate()
            .map(|(ordinal, (node, text))| HighlightMarker { node, ordinal, text })
            .collect();
        self.markers.extend(markers.iter().map(|m| m.node));
        log::debug!("Applied {} of {} highlights", markers.len(), spans.len());
        markers
    }

    fn wrap_span(&mut self, doc: &mut Document, span: &MatchSpan) -> Result<NodeId, SearchError> {
        let fail = |source: DomError| SearchError::MarkerApplication {
            node: span.node,
            offset: span.offset,
            source,
        };

        let text = doc.text(span.node).ok_or(DomError::NotText(span.node)).map_err(fail)?;
        let len = text.len();
        let end = span.end();
        if span.length == 0 || end > len {
            return Err(fail(DomError::OffsetOutOfBounds {
                node: span.node,
                offset: end,
                len,
            }));
        }
        for offset in [span.offset, end] {
            if !text.is_char_boundary(offset) {
                return Err(fail(DomError::NotCharBoundary {
                    node: span.node,
                    offset,
                }));
            }
        }
        if !doc.is_attached(span.node) {
            return Err(fail(DomError::Detached(span.node)));
        }

        if end < len {
            let tail = doc.split_text(span.node, end).map_err(fail)?;
            self.fragments.push(tail);
        }
        let middle = if span.offset > 0 {
            let middle = doc.split_text(span.node, span.offset).map_err(fail)?;
            self.fragments.push(middle);
            middle
        } else {
            span.node
        };

        let marker = doc.create_element(&self.tag);
        if let Some(el) = doc.element_mut(marker) {
            el.add_class(&self.class);
        }
        if let Err(e) = doc.wrap(middle, marker) {
            doc.remove(marker);
            return Err(fail(e));
        }
        Ok(marker)
    }

    /// Remove every tracked marker and re-join the text it split.
    ///
    /// Safe with nothing tracked, and idempotent. Markers that outside code
    /// already removed are skipped with a warning. Returns how many markers
    /// were unwrapped.
    pub fn clear(&mut self, doc: &mut Document) -> usize {
        if self.is_empty() {
            return 0;
        }

        let mut removed = 0;
        for marker in self.markers.drain(..).rev() {
            if !doc.contains(marker) {
                log::warn!("Marker {marker} vanished before clear");
                continue;
            }
            match doc.unwrap(marker) {
                Ok(_) => removed += 1,
                Err(e) => log::warn!("Could not unwrap marker {marker}: {e}"),
            }
        }

        // Fragments were split off right-to-left, so in creation order each
        // one's left neighbour is still alive when it is joined.
        for fragment in self.fragments.drain(..) {
            if !doc.contains(fragment) {
                log::warn!("Text fragment {fragment} vanished before clear");
                continue;
            }
            if let Err(e) = doc.join_with_previous(fragment) {
                log::warn!("Could not re-join text fragment {fragment}: {e}");
            }
        }

        log::debug!("Cleared {removed} highlights");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::EnumerateConfig;
    use crate::dom::load::from_xhtml;
    use crate::dom::serialize::{outline, to_markup};
    use crate::search::{collect_matches, Matcher, SearchOptions, SegmentEnumerator};

    fn spans_for(doc: &Document, query: &str, options: SearchOptions) -> Vec<MatchSpan> {
        let enumerator =
            SegmentEnumerator::new(&EnumerateConfig::default(), &HighlightConfig::default());
        let matcher = Matcher::new(query, options).unwrap();
        collect_matches(enumerator.segments(doc, doc.root()), &matcher)
    }

    fn highlight(xhtml: &str, query: &str) -> (Document, Highlighter, Vec<HighlightMarker>) {
        let mut doc = from_xhtml(xhtml).unwrap();
        let spans = spans_for(&doc, query, SearchOptions::default());
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        let markers = highlighter.apply(&mut doc, &spans);
        (doc, highlighter, markers)
    }

    // ── apply ───────────────────────────────────────────────────────

    #[test]
    fn apply_wraps_each_match() {
        let (doc, _, markers) = highlight("<p>The cat sat on the mat.</p>", "at");
        assert_eq!(markers.len(), 3);
        assert_eq!(
            to_markup(&doc),
            "<p>The c<mark class=\"findmark-highlight\">at</mark> s<mark class=\"findmark-highlight\">at</mark> on the m<mark class=\"findmark-highlight\">at</mark>.</p>"
        );
    }

    #[test]
    fn markers_are_returned_in_document_order() {
        let (doc, _, markers) = highlight("<p>a1 a2</p><p>a3</p>", "a");
        let ordinals: Vec<usize> = markers.iter().map(|m| m.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        let following: Vec<String> = markers
            .iter()
            .map(|m| {
                let parent = doc.parent(m.node).unwrap();
                let siblings = doc.children(parent);
                let index = siblings.iter().position(|&s| s == m.node).unwrap();
                doc.text(siblings[index + 1]).unwrap().to_string()
            })
            .collect();
        assert_eq!(following, vec!["1 ", "2", "3"]);
    }

    #[test]
    fn marker_owns_exactly_the_matched_text() {
        let (doc, _, markers) = highlight("<p>Hello World</p>", "world");
        assert_eq!(markers[0].text, "World");
        assert_eq!(doc.text_content(markers[0].node), "World");
        assert_eq!(doc.children(markers[0].node).len(), 1);
    }

    #[test]
    fn whole_segment_match_wraps_original_node() {
        let mut doc = from_xhtml("<p>abc</p>").unwrap();
        let spans = spans_for(&doc, "abc", SearchOptions::default());
        let original = spans[0].node;
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        let markers = highlighter.apply(&mut doc, &spans);
        assert_eq!(doc.children(markers[0].node), &[original]);
    }

    #[test]
    fn adjacent_matches_are_both_wrapped() {
        let (doc, _, markers) = highlight("<p>xx</p>", "x");
        assert_eq!(markers.len(), 2);
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 2);
    }

    #[test]
    fn failed_span_is_skipped_not_fatal() {
        let mut doc = from_xhtml("<p>one two</p>").unwrap();
        let mut spans = spans_for(&doc, "o", SearchOptions::default());
        assert_eq!(spans.len(), 2);
        spans.push(MatchSpan {
            node: spans[0].node,
            segment_index: 0,
            offset: 40,
            length: 2,
            text: "zz".to_string(),
        });
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        let markers = highlighter.apply(&mut doc, &spans);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].ordinal, 1);
    }

    #[test]
    fn span_on_detached_node_is_skipped() {
        let mut doc = from_xhtml("<p>abc</p>").unwrap();
        let spans = spans_for(&doc, "b", SearchOptions::default());
        let p = doc.children(doc.root())[0];
        doc.detach(p);
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        assert!(highlighter.apply(&mut doc, &spans).is_empty());
        assert!(highlighter.is_empty());
    }

    #[test]
    fn apply_with_no_spans_is_noop() {
        let mut doc = from_xhtml("<p>abc</p>").unwrap();
        let before = outline(&doc);
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        assert!(highlighter.apply(&mut doc, &[]).is_empty());
        assert_eq!(outline(&doc), before);
    }

    #[test]
    fn custom_marker_tag_and_class() {
        let mut doc = from_xhtml("<p>abc</p>").unwrap();
        let spans = spans_for(&doc, "b", SearchOptions::default());
        let config = HighlightConfig {
            tag: "span".to_string(),
            class: "hit".to_string(),
            current_class: "now".to_string(),
        };
        let mut highlighter = Highlighter::new(&config);
        highlighter.apply(&mut doc, &spans);
        assert_eq!(to_markup(&doc), "<p>a<span class=\"hit\">b</span>c</p>");
    }

    // ── clear ───────────────────────────────────────────────────────

    #[test]
    fn clear_restores_exact_structure() {
        let source = "<div><p>The cat sat on the mat.</p><p>at<b>at</b>xat</p></div>";
        let pristine = outline(&from_xhtml(source).unwrap());
        let (mut doc, mut highlighter, markers) = highlight(source, "at");
        assert_eq!(markers.len(), 6);
        assert_ne!(outline(&doc), pristine);
        assert_eq!(highlighter.clear(&mut doc), 6);
        assert_eq!(outline(&doc), pristine);
    }

    #[test]
    fn clear_keeps_original_text_node_identity() {
        let mut doc = from_xhtml("<p>aXbYc</p>").unwrap();
        let spans = spans_for(&doc, "[XY]", SearchOptions::default().with_regex(true));
        let original = spans[0].node;
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        highlighter.apply(&mut doc, &spans);
        highlighter.clear(&mut doc);
        assert_eq!(doc.text(original), Some("aXbYc"));
    }

    #[test]
    fn clear_restores_node_count() {
        let source = "<p>xx yx</p>";
        let pristine = from_xhtml(source).unwrap().node_count();
        let (mut doc, mut highlighter, _) = highlight(source, "x");
        assert!(doc.node_count() > pristine);
        highlighter.clear(&mut doc);
        assert_eq!(doc.node_count(), pristine);
    }

    #[test]
    fn clear_is_idempotent() {
        let (mut doc, mut highlighter, _) = highlight("<p>a b a</p>", "a");
        highlighter.clear(&mut doc);
        let once = outline(&doc);
        assert_eq!(highlighter.clear(&mut doc), 0);
        assert_eq!(outline(&doc), once);
    }

    #[test]
    fn clear_with_nothing_tracked_is_noop() {
        let mut doc = from_xhtml("<p>abc</p>").unwrap();
        let before = outline(&doc);
        let mut highlighter = Highlighter::new(&HighlightConfig::default());
        assert_eq!(highlighter.clear(&mut doc), 0);
        assert_eq!(outline(&doc), before);
    }

    #[test]
    fn clear_tolerates_markers_removed_by_outside_code() {
        let (mut doc, mut highlighter, markers) = highlight("<p>a b a</p>", "a");
        doc.remove(markers[0].node);
        assert_eq!(highlighter.clear(&mut doc), 1);
        assert!(highlighter.is_empty());
        assert_eq!(to_markup(&doc), "<p> b a</p>");
    }

    #[test]
    fn apply_twice_then_clear_restores_everything() {
        let source = "<p>abcd abcd</p><p>dcba</p>";
        let pristine = outline(&from_xhtml(source).unwrap());
        let (mut doc, mut highlighter, first) = highlight(source, "b");
        assert_eq!(first.len(), 3);

        let spans = spans_for(&doc, "d", SearchOptions::default());
        let second = highlighter.apply(&mut doc, &spans);
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].ordinal, 0);
        assert_eq!(highlighter.marker_count(), 6);

        assert_eq!(highlighter.clear(&mut doc), 6);
        assert_eq!(outline(&doc), pristine);
    }

    #[test]
    fn rehighlight_after_clear_finds_same_matches() {
        let (mut doc, mut highlighter, first) = highlight("<p>ab ab</p><p>ab</p>", "ab");
        highlighter.clear(&mut doc);
        let spans = spans_for(&doc, "ab", SearchOptions::default());
        let second = highlighter.apply(&mut doc, &spans);
        assert_eq!(first.len(), second.len());
        let texts: Vec<&str> = second.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "ab", "ab"]);
    }
}
