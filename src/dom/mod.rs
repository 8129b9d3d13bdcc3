pub mod load;
pub mod serialize;

use std::fmt;

/// Tag of the synthetic root element every document starts with.
pub const ROOT_TAG: &str = "#document";

/// Handle to a node in a [`Document`].
///
/// A handle is only valid while the node it names is alive. Removing a node
/// bumps its slot generation, so a handle kept across the removal is stale
/// and will not resolve to whatever node reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Element payload: lowercase tag name plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    /// Iterate the space-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let remaining = self
            .classes()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            self.set_attr("class", remaining);
        }
    }

    /// Value of an inline `style` declaration, e.g. `display` → `none`.
    /// The last declaration of a property wins.
    pub fn style_property(&self, property: &str) -> Option<&str> {
        self.attr("style")?
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .last()
            .map(|(_, value)| value.trim())
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// A live node: its payload plus tree links.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Effective rendering state of an element after inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedStyle {
    /// False when the element or an ancestor is `display: none` or `hidden`.
    pub displayed: bool,
    /// Resolved `visibility` (inherited, overridable by descendants).
    pub visible: bool,
}

impl ComputedStyle {
    pub fn is_rendered(&self) -> bool {
        self.displayed && self.visible
    }
}

/// Structural failures of tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} is not a text node")]
    NotText(NodeId),
    #[error("node {0} is not an element")]
    NotElement(NodeId),
    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),
    #[error("offset {offset} is past the end of node {node} (length {len})")]
    OffsetOutOfBounds { node: NodeId, offset: usize, len: usize },
    #[error("offset {offset} is not on a character boundary in node {node}")]
    NotCharBoundary { node: NodeId, offset: usize },
    #[error("node {0} has no preceding text sibling")]
    NoPreviousText(NodeId),
    #[error("inserting node {0} would make it its own ancestor")]
    Cycle(NodeId),
}

/// An arena of nodes rooted at a synthetic [`ROOT_TAG`] element.
///
/// Accessors that return `Option` (`get`, `element`, `text`, ...) never
/// panic. Accessors that return the node's links directly (`node`, `kind`,
/// `parent`, `children`) treat a stale handle as a programming error and
/// panic.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    scroll_anchor: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            scroll_anchor: None,
        };
        doc.root = doc.alloc(NodeKind::Element(ElementData::new(ROOT_TAG)));
        doc
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The first `body` element in document order, or the root if there is none.
    pub fn body(&self) -> NodeId {
        self.descendants(self.root)
            .find(|&id| self.element(id).is_some_and(|el| el.tag == "body"))
            .unwrap_or(self.root)
    }

    // ── Creation ────────────────────────────────────────────────────────

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether `id` still names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node handle {id}"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node handle {id}"),
        }
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Nearest ancestor (excluding `id`) that is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.element(a).is_some())
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Lazy pre-order walk over the strict descendants of `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Concatenated text of all descendant text nodes (comments excluded).
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|d| self.text(d))
            .collect()
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    // ── Style ───────────────────────────────────────────────────────────

    /// Resolve display/visibility for `id` (or its parent element, when `id`
    /// is not an element) through inheritance.
    pub fn computed_style(&self, id: NodeId) -> ComputedStyle {
        let start = if self.element(id).is_some() {
            Some(id)
        } else {
            self.parent_element(id)
        };
        let mut displayed = true;
        let mut visible = None;
        for el in std::iter::successors(start, |&n| self.parent(n)).filter_map(|n| self.element(n))
        {
            if el.attr("hidden").is_some()
                || el
                    .style_property("display")
                    .is_some_and(|v| v.eq_ignore_ascii_case("none"))
            {
                displayed = false;
            }
            if visible.is_none() {
                visible = el.style_property("visibility").map(|v| {
                    !(v.eq_ignore_ascii_case("hidden") || v.eq_ignore_ascii_case("collapse"))
                });
            }
        }
        ComputedStyle {
            displayed,
            visible: visible.unwrap_or(true),
        }
    }

    // ── Mutation ────────────────────────────────────────────────────────

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.element(parent).is_none() {
            return Err(DomError::NotElement(parent));
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::Cycle(child));
        }
        Ok(())
    }

    /// Unlink `id` from its parent. The node stays alive.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        Ok(())
    }

    /// Append text under `parent`, extending a trailing text child if present.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        if let Some(&last) = self.children(parent).last() {
            if let Some(Node {
                kind: NodeKind::Text(existing),
                ..
            }) = self.get_mut(last)
            {
                existing.push_str(text);
                return Ok(last);
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node)?;
        Ok(node)
    }

    fn insert_at_offset(&mut self, reference: NodeId, new: NodeId, after: bool) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insert(parent, new)?;
        self.detach(new);
        let index = self
            .child_index(parent, reference)
            .ok_or(DomError::Detached(reference))?;
        let index = if after { index + 1 } else { index };
        self.node_mut(new).parent = Some(parent);
        self.node_mut(parent).children.insert(index, new);
        Ok(())
    }

    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        self.insert_at_offset(reference, new, false)
    }

    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        self.insert_at_offset(reference, new, true)
    }

    /// Detach `id` and free it together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        debug_assert_ne!(id, self.root, "the root node cannot be removed");
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let slot = &mut self.slots[next.index as usize];
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(next.index);
            }
            if self.scroll_anchor == Some(next) {
                self.scroll_anchor = None;
            }
        }
    }

    /// Replace the contents of a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        match self.get_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Text(existing)) => {
                *existing = text.into();
                Ok(())
            }
            _ => Err(DomError::NotText(id)),
        }
    }

    /// Split a text node at byte `offset`. The node keeps `[..offset]`; a new
    /// text node holding `[offset..]` is returned and, when the node is
    /// attached, inserted as its next sibling.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id))?;
        if offset > text.len() {
            return Err(DomError::OffsetOutOfBounds {
                node: id,
                offset,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(offset) {
            return Err(DomError::NotCharBoundary { node: id, offset });
        }
        let tail = text[offset..].to_string();
        if let NodeKind::Text(existing) = &mut self.node_mut(id).kind {
            existing.truncate(offset);
        }
        let new = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, new)?;
        }
        Ok(new)
    }

    /// Append a text node's content to its preceding text sibling and free it.
    /// Returns the surviving sibling.
    pub fn join_with_previous(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id))?.to_string();
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let index = self.child_index(parent, id).ok_or(DomError::Detached(id))?;
        let previous = index
            .checked_sub(1)
            .map(|i| self.children(parent)[i])
            .filter(|&p| self.text(p).is_some())
            .ok_or(DomError::NoPreviousText(id))?;
        if let NodeKind::Text(existing) = &mut self.node_mut(previous).kind {
            existing.push_str(&text);
        }
        self.remove(id);
        Ok(previous)
    }

    /// Put `wrapper` where `node` is and move `node` inside it.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) -> Result<(), DomError> {
        let parent = self.parent(node).ok_or(DomError::Detached(node))?;
        self.check_insert(parent, wrapper)?;
        self.check_insert(wrapper, node)?;
        self.insert_before(node, wrapper)?;
        self.append_child(wrapper, node)
    }

    /// Move an element's children into its place and free the element.
    pub fn unwrap(&mut self, element: NodeId) -> Result<Vec<NodeId>, DomError> {
        if self.element(element).is_none() {
            return Err(DomError::NotElement(element));
        }
        if self.parent(element).is_none() {
            return Err(DomError::Detached(element));
        }
        let children = self.children(element).to_vec();
        for &child in &children {
            self.insert_before(element, child)?;
        }
        self.remove(element);
        Ok(children)
    }

    // ── Viewport ────────────────────────────────────────────────────────

    /// Record `id` as the node the host should bring into view.
    pub fn scroll_into_view(&mut self, id: NodeId) {
        debug_assert!(self.contains(id), "scroll target {id} is stale");
        log::trace!("scroll into view: {id}");
        self.scroll_anchor = Some(id);
    }

    pub fn scroll_anchor(&self) -> Option<NodeId> {
        self.scroll_anchor
    }
}

/// Pre-order iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
