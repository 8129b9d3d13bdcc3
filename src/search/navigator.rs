use crate::dom::{Document, NodeId};

use super::{HighlightMarker, MatchHandle};

/// Navigation state over the match list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// No matches; there is no cursor.
    Empty,
    /// Cursor points at a valid index.
    Positioned(usize),
}

/// Cyclic cursor over the highlighted markers.
///
/// Keeps exactly one marker flagged current whenever the list is non-empty.
#[derive(Debug)]
pub struct Navigator {
    markers: Vec<HighlightMarker>,
    cursor: Option<usize>,
    current_class: String,
}

impl Navigator {
    pub fn new(current_class: impl Into<String>) -> Self {
        Self {
            markers: Vec::new(),
            cursor: None,
            current_class: current_class.into(),
        }
    }

    /// Take a fresh marker list. Positions on the first marker when there is one.
    pub fn reset(&mut self, doc: &mut Document, markers: Vec<HighlightMarker>) {
        self.unflag(doc);
        self.markers = markers;
        self.cursor = None;
        if !self.markers.is_empty() {
            self.move_to(doc, 0);
        }
    }

    /// Drop all markers and the cursor. Leaves the tree alone apart from
    /// clearing the current flag.
    pub fn clear(&mut self, doc: &mut Document) {
        self.unflag(doc);
        self.markers.clear();
        self.cursor = None;
    }

    /// Advance to the next marker, wrapping from last to first.
    pub fn next(&mut self, doc: &mut Document) -> Option<MatchHandle> {
        let cursor = self.cursor?;
        self.move_to(doc, (cursor + 1) % self.markers.len());
        self.current()
    }

    /// Go back to the previous marker, wrapping from first to last.
    pub fn prev(&mut self, doc: &mut Document) -> Option<MatchHandle> {
        let cursor = self.cursor?;
        let len = self.markers.len();
        self.move_to(doc, (cursor + len - 1) % len);
        self.current()
    }

    pub fn state(&self) -> NavState {
        match self.cursor {
            Some(index) => NavState::Positioned(index),
            None => NavState::Empty,
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> &[HighlightMarker] {
        &self.markers
    }

    /// Handle to the current marker, if any.
    pub fn current(&self) -> Option<MatchHandle> {
        let index = self.cursor?;
        self.markers.get(index).map(|m| MatchHandle {
            index,
            node: m.node,
        })
    }

    fn move_to(&mut self, doc: &mut Document, index: usize) {
        // Clear the old flag before setting the new one.
        self.unflag(doc);
        self.cursor = Some(index);
        let node = self.markers[index].node;
        if self.flag(doc, node) {
            doc.scroll_into_view(node);
        } else {
            log::warn!("Current marker {node} is no longer in the tree");
        }
    }

    fn flag(&self, doc: &mut Document, node: NodeId) -> bool {
        match doc.element_mut(node) {
            Some(el) => {
                el.add_class(&self.current_class);
                true
            }
            None => false,
        }
    }

    fn unflag(&self, doc: &mut Document) {
        let Some(index) = self.cursor else {
            return;
        };
        if let Some(el) = self
            .markers
            .get(index)
            .and_then(|m| doc.element_mut(m.node))
        {
            el.remove_class(&self.current_class);
        }
    }
}
