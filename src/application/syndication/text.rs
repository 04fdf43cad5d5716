//! Escaping and plain-text helpers shared by the feed writers.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use tracing::debug;

const SOURCE: &str = "application::syndication::text";

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Wrap `input` in a CDATA section, splitting any embedded terminator.
pub(crate) fn cdata(input: &str) -> String {
    format!("<![CDATA[{}]]>", input.replace("]]>", "]]]]><![CDATA[>"))
}

/// Text for an XML comment; `--` is not allowed inside one.
pub(crate) fn comment_text(input: &str) -> String {
    input.replace("--", "- -")
}

/// Elements that start a new run of text.
const BLOCK_ELEMENTS: &str = "address, article, aside, blockquote, br, dd, div, dl, dt, \
     figcaption, figure, footer, h1, h2, h3, h4, h5, h6, header, hr, li, main, nav, ol, p, pre, \
     section, table, td, th, tr, ul";

/// Plain text of an HTML fragment with runs of whitespace collapsed.
///
/// Script, style and template contents are dropped. Entities are decoded
/// with the HTML5 table; text that does not decode cleanly is kept as written.
pub(crate) fn html_to_text(html: &str) -> String {
    let visible = match rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("script, style, template", |el| {
                el.remove();
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    ) {
        Ok(visible) => visible,
        Err(err) => {
            debug!(target = SOURCE, error = %err, "html fragment could not be parsed");
            return String::new();
        }
    };

    let text = Rc::new(RefCell::new(String::with_capacity(visible.len())));
    let extracted = rewrite_str(
        &visible,
        RewriteStrSettings {
            element_content_handlers: vec![element!(BLOCK_ELEMENTS, {
                let text = Rc::clone(&text);
                move |_| {
                    text.borrow_mut().push(' ');
                    Ok(())
                }
            })],
            document_content_handlers: vec![doc_text!({
                let text = Rc::clone(&text);
                move |chunk| {
                    text.borrow_mut().push_str(chunk.as_str());
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    );
    if let Err(err) = extracted {
        debug!(target = SOURCE, error = %err, "html text extraction failed");
        return String::new();
    }

    let raw = text.take();
    let decoded = match unescape_with(&raw, resolve_html5_entity) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.clone(),
    };
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
