use crate::config::types::{EnumerateConfig, HighlightConfig};
use crate::dom::{Descendants, Document, NodeId};

use super::TextSegment;

/// Decides which text nodes are eligible for matching and walks them in
/// document order.
///
/// A text node is skipped when it is blank, when its nearest element is a
/// non-rendered container (`script`, `style`, ...), when any ancestor is a
/// highlight marker, or when its element is not displayed or not visible.
#[derive(Debug, Clone)]
pub struct SegmentEnumerator {
    skip_tags: Vec<String>,
    marker_tag: String,
    marker_class: String,
}

impl SegmentEnumerator {
    pub fn new(enumerate: &EnumerateConfig, highlight: &HighlightConfig) -> Self {
        Self {
            skip_tags: enumerate.skip_tags.clone(),
            marker_tag: highlight.tag.clone(),
            marker_class: highlight.class.clone(),
        }
    }

    /// Lazily enumerate eligible segments under `root`, pre-order.
    /// Call again for a fresh pass; a pass never mutates the tree.
    pub fn segments<'a>(&'a self, doc: &'a Document, root: NodeId) -> Segments<'a> {
        Segments {
            doc,
            enumerator: self,
            walk: doc.descendants(root),
            next_index: 0,
        }
    }

    pub fn accepts(&self, doc: &Document, id: NodeId) -> bool {
        let Some(text) = doc.text(id) else {
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }
        let Some(parent) = doc.parent_element(id) else {
            return false;
        };
        if doc
            .element(parent)
            .is_some_and(|el| self.skip_tags.iter().any(|t| t.eq_ignore_ascii_case(&el.tag)))
        {
            return false;
        }
        if self.is_inside_marker(doc, id) {
            return false;
        }
        doc.computed_style(parent).is_rendered()
    }

    pub fn is_marker(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id)
            .is_some_and(|el| el.tag == self.marker_tag && el.has_class(&self.marker_class))
    }

    fn is_inside_marker(&self, doc: &Document, id: NodeId) -> bool {
        doc.ancestors(id).any(|a| self.is_marker(doc, a))
    }
}

/// Iterator returned by [`SegmentEnumerator::segments`].
pub struct Segments<'a> {
    doc: &'a Document,
    enumerator: &'a SegmentEnumerator,
    walk: Descendants<'a>,
    next_index: usize,
}

impl Iterator for Segments<'_> {
    type Item = TextSegment;

    fn next(&mut self) -> Option<TextSegment> {
        loop {
            let id = self.walk.next()?;
            if !self.enumerator.accepts(self.doc, id) {
                continue;
            }
            let content = self.doc.text(id).unwrap_or_default().to_string();
            let segment = TextSegment {
                node: id,
                index: self.next_index,
                content,
            };
            self.next_index += 1;
            return Some(segment);
        }
    }
}
