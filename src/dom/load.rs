use std::path::Path;

use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser, Tag};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Document, DomError, NodeId};

/// Errors that can occur while building a document from a file or string.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("markup error at byte {position}: {message}")]
    Markup { position: usize, message: String },
    #[error("tree error: {0}")]
    Dom(#[from] DomError),
}

/// Load a document, choosing the parser by file extension.
/// `.md` and `.markdown` are read as Markdown, everything else as XHTML.
pub fn load_path(path: &Path) -> Result<Document, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    let is_markdown = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"));
    log::debug!(
        "Loading {} as {}",
        path.display(),
        if is_markdown { "markdown" } else { "xhtml" }
    );
    if is_markdown {
        from_markdown(&contents)
    } else {
        from_xhtml(&contents)
    }
}

/// Parse well-formed XHTML (or any XML) into a document. Whitespace is kept.
pub fn from_xhtml(source: &str) -> Result<Document, LoadError> {
    let mut doc = Document::new();
    let mut reader = Reader::from_str(source);
    let mut stack = vec![doc.root()];

    loop {
        let parent = stack.last().copied().unwrap_or(doc.root());
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let el = element_from(&mut doc, e);
                doc.append_child(parent, el)?;
                stack.push(el);
            }
            Ok(Event::Empty(ref e)) => {
                let el = element_from(&mut doc, e);
                doc.append_child(parent, el)?;
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(err) => {
                        log::warn!("Keeping raw text after unescape failure: {err}");
                        String::from_utf8_lossy(&e).into_owned()
                    }
                };
                if !text.is_empty() {
                    doc.append_text(parent, &text)?;
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                if !text.is_empty() {
                    doc.append_text(parent, &text)?;
                }
            }
            Ok(Event::Comment(e)) => {
                let comment = doc.create_comment(String::from_utf8_lossy(&e).into_owned());
                doc.append_child(parent, comment)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::Markup {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                });
            }
            // Declarations, processing instructions, doctype
            Ok(_) => {}
        }
    }

    Ok(doc)
}

fn element_from(doc: &mut Document, e: &BytesStart<'_>) -> NodeId {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let id = doc.create_element(&tag);
    if let Some(el) = doc.element_mut(id) {
        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            el.set_attr(&key, value);
        }
    }
    id
}

/// Parse Markdown into a document rooted at a `body` element.
///
/// Raw HTML in the source becomes comment nodes so it is never searched.
pub fn from_markdown(source: &str) -> Result<Document, LoadError> {
    let mut doc = Document::new();
    let body = doc.create_element("body");
    doc.append_child(doc.root(), body)?;
    let mut stack = vec![body];

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    for event in Parser::new_ext(source, options) {
        let parent = stack.last().copied().unwrap_or(body);
        match event {
            MdEvent::Start(tag) => {
                let el = doc.create_element(markdown_tag_name(&tag));
                if let Some(data) = doc.element_mut(el) {
                    match &tag {
                        Tag::Link { dest_url, .. } => data.set_attr("href", dest_url.to_string()),
                        Tag::Image { dest_url, .. } => data.set_attr("src", dest_url.to_string()),
                        Tag::CodeBlock(CodeBlockKind::Fenced(lang)) if !lang.is_empty() => {
                            data.set_attr("class", format!("language-{lang}"))
                        }
                        _ => {}
                    }
                }
                doc.append_child(parent, el)?;
                stack.push(el);
            }
            MdEvent::End(_) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            MdEvent::Text(text) => {
                doc.append_text(parent, &text)?;
            }
            MdEvent::Code(text) => {
                let code = doc.create_element("code");
                doc.append_child(parent, code)?;
                doc.append_text(code, &text)?;
            }
            MdEvent::Html(html) | MdEvent::InlineHtml(html) => {
                let comment = doc.create_comment(html.to_string());
                doc.append_child(parent, comment)?;
            }
            MdEvent::SoftBreak => {
                doc.append_text(parent, "\n")?;
            }
            MdEvent::HardBreak => {
                let br = doc.create_element("br");
                doc.append_child(parent, br)?;
            }
            MdEvent::Rule => {
                let hr = doc.create_element("hr");
                doc.append_child(parent, hr)?;
            }
            other => log::trace!("Ignoring markdown event {other:?}"),
        }
    }

    Ok(doc)
}

fn markdown_tag_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Paragraph => "p",
        Tag::Heading { level, .. } => match level {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        },
        Tag::BlockQuote(_) => "blockquote",
        Tag::CodeBlock(_) => "pre",
        Tag::List(Some(_)) => "ol",
        Tag::List(None) => "ul",
        Tag::Item => "li",
        Tag::Emphasis => "em",
        Tag::Strong => "strong",
        Tag::Strikethrough => "del",
        Tag::Link { .. } => "a",
        Tag::Image { .. } => "img",
        Tag::Table(_) => "table",
        Tag::TableHead => "thead",
        Tag::TableRow => "tr",
        Tag::TableCell => "td",
        _ => "div",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize::{outline, to_markup};

    // ── XHTML ───────────────────────────────────────────────────────

    #[test]
    fn xhtml_builds_nested_elements() {
        let doc = from_xhtml("<html><body><p class=\"lead\">Hello <b>world</b></p></body></html>")
            .unwrap();
        let body = doc.body();
        assert_eq!(doc.element(body).unwrap().tag, "body");
        assert_eq!(doc.text_content(body), "Hello world");
        assert_eq!(
            to_markup(&doc),
            "<html><body><p class=\"lead\">Hello <b>world</b></p></body></html>"
        );
    }

    #[test]
    fn xhtml_unescapes_entities() {
        let doc = from_xhtml("<p>a &amp; b &lt;c&gt;</p>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "a & b <c>");
    }

    #[test]
    fn xhtml_keeps_comments_out_of_text() {
        let doc = from_xhtml("<p>one<!-- two -->three</p>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "onethree");
        assert!(outline(&doc).contains("<!-- two -->"));
    }

    #[test]
    fn xhtml_self_closing_elements() {
        let doc = from_xhtml("<p>a<br/>b</p>").unwrap();
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 3);
    }

    #[test]
    fn xhtml_mismatched_tags_is_error() {
        let result = from_xhtml("<p><b>oops</p>");
        assert!(matches!(result, Err(LoadError::Markup { .. })));
    }

    // ── Markdown ────────────────────────────────────────────────────

    #[test]
    fn markdown_maps_blocks_to_html_tags() {
        let doc = from_markdown("# Title\n\nSome *emphasis* and `code`.\n").unwrap();
        let markup = to_markup(&doc);
        assert!(markup.starts_with("<body><h1>Title</h1><p>Some <em>emphasis</em>"));
        assert!(markup.contains("<code>code</code>"));
    }

    #[test]
    fn markdown_raw_html_becomes_comment() {
        let doc = from_markdown("before <span>inline</span> after\n").unwrap();
        let text = doc.text_content(doc.root());
        assert!(!text.contains("<span>"));
        assert!(text.contains("before"));
    }

    #[test]
    fn markdown_fenced_code_gets_language_class() {
        let doc = from_markdown("```rust\nfn main() {}\n```\n").unwrap();
        assert!(to_markup(&doc).contains("<pre class=\"language-rust\">"));
    }

    #[test]
    fn markdown_merges_adjacent_text_events() {
        let doc = from_markdown("it's a [link](http://x) here\n").unwrap();
        let p = doc.children(doc.body())[0];
        let text_children = doc
            .children(p)
            .iter()
            .filter(|&&c| doc.text(c).is_some())
            .count();
        assert_eq!(text_children, 2);
    }

    // ── Paths ───────────────────────────────────────────────────────

    #[test]
    fn load_path_picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("notes.md");
        std::fs::write(&md, "hello *there*\n").unwrap();
        let doc = load_path(&md).unwrap();
        assert_eq!(doc.element(doc.body()).unwrap().tag, "body");

        let xhtml = dir.path().join("page.xhtml");
        std::fs::write(&xhtml, "<div>hello</div>").unwrap();
        let doc = load_path(&xhtml).unwrap();
        assert_eq!(doc.body(), doc.root());
        assert_eq!(doc.text_content(doc.root()), "hello");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = load_path(Path::new("/tmp/nonexistent_findmark_doc.xhtml"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
