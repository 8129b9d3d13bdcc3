use super::{MatchSpan, Matcher, TextSegment};

/// Run `matcher` over every segment and concatenate the results.
///
/// Output is in document order: segment order first, then ascending offset
/// within a segment. Nothing is mutated here.
pub fn collect_matches<I>(segments: I, matcher: &Matcher) -> Vec<MatchSpan>
where
    I: IntoIterator<Item = TextSegment>,
{
    let mut spans = Vec::new();
    let mut scanned = 0usize;
    for segment in segments {
        scanned += 1;
        for range in matcher.find_all(&segment.content) {
            spans.push(MatchSpan {
                node: segment.node,
                segment_index: segment.index,
                offset: range.start,
                length: range.len(),
                text: segment.content[range].to_string(),
            });
        }
    }
    log::debug!("Collected {} matches from {} segments", spans.len(), scanned);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{EnumerateConfig, HighlightConfig};
    use crate::dom::load::from_xhtml;
    use crate::search::{SearchOptions, SegmentEnumerator};

    fn collect(xhtml: &str, query: &str, options: SearchOptions) -> Vec<MatchSpan> {
        let doc = from_xhtml(xhtml).unwrap();
        let enumerator =
            SegmentEnumerator::new(&EnumerateConfig::default(), &HighlightConfig::default());
        let matcher = Matcher::new(query, options).unwrap();
        collect_matches(enumerator.segments(&doc, doc.root()), &matcher)
    }

    #[test]
    fn collects_across_segments_in_document_order() {
        let spans = collect(
            "<div><p>first foo</p><p>nothing</p><p>foo and foo</p></div>",
            "foo",
            SearchOptions::default(),
        );
        let positions: Vec<(usize, usize)> =
            spans.iter().map(|s| (s.segment_index, s.offset)).collect();
        assert_eq!(positions, vec![(0, 6), (2, 0), (2, 8)]);
    }

    #[test]
    fn spans_carry_matched_text_with_original_case() {
        let spans = collect("<p>Foo fOO</p>", "foo", SearchOptions::default());
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Foo", "fOO"]);
        assert!(spans.iter().all(|s| s.length == 3));
    }

    #[test]
    fn spans_stay_within_segment_bounds() {
        let spans = collect(
            "<p>a<b>bb</b>aaa</p>",
            "a+",
            SearchOptions::default().with_regex(true),
        );
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[1].offset, spans[1].length), (0, 3));
    }

    #[test]
    fn order_is_non_decreasing() {
        let spans = collect(
            "<div><p>x x</p><ul><li>x</li><li>xx x</li></ul>x</div>",
            "x",
            SearchOptions::default(),
        );
        assert_eq!(spans.len(), 7);
        assert!(spans
            .windows(2)
            .all(|w| (w[0].segment_index, w[0].offset) < (w[1].segment_index, w[1].offset)));
    }

    #[test]
    fn empty_matcher_collects_nothing() {
        let spans = collect("<p>anything</p>", "", SearchOptions::default());
        assert!(spans.is_empty());
    }
}
