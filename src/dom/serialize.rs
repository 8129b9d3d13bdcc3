use std::fmt::Write;

use quick_xml::escape::{escape, partial_escape};

use super::{Document, NodeId, NodeKind};

/// Serialize the root's children as XHTML-like markup.
pub fn to_markup(doc: &Document) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        write_markup(doc, child, &mut out);
    }
    out
}

/// Serialize a single node (and its subtree) as markup.
pub fn node_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_markup(doc, id, &mut out);
    out
}

fn write_markup(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (key, value) in &el.attrs {
                let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
            }
            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in children {
                write_markup(doc, child, out);
            }
            let _ = write!(out, "</{}>", el.tag);
        }
    }
}

/// Indented one-line-per-node dump of the whole tree.
///
/// Unlike [`to_markup`], adjacent text nodes stay distinguishable, so two
/// outlines are equal only when the node structure is equal.
pub fn outline(doc: &Document) -> String {
    let mut out = String::new();
    write_outline(doc, doc.root(), 0, &mut out);
    out
}

fn write_outline(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match doc.kind(id) {
        NodeKind::Text(text) => {
            let _ = writeln!(out, "{indent}{text:?}");
        }
        NodeKind::Comment(text) => {
            let _ = writeln!(out, "{indent}<!--{text}-->");
        }
        NodeKind::Element(el) => {
            let _ = write!(out, "{indent}<{}", el.tag);
            for (key, value) in &el.attrs {
                let _ = write!(out, " {key}={value:?}");
            }
            let _ = writeln!(out, ">");
            for &child in doc.children(id) {
                write_outline(doc, child, depth + 1, out);
            }
        }
    }
}
