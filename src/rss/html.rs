//! HTML to plain text for feed descriptions

use scraper::{ElementRef, Html, Node};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements whose boundaries separate words
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Converts an HTML fragment to whitespace-collapsed plain text
///
/// Text inside `script`/`style` elements is dropped. Inline markup adds no
/// spacing of its own; block elements are separated by a single space.
/// Plain text input is returned with its whitespace collapsed.
///
/// # Example
///
/// ```
/// use clinic_scout::rss::html_to_text;
///
/// let text = html_to_text("<p>Knee <b>pain</b> clinic</p>");
/// assert_eq!(text, "Knee pain clinic");
/// ```
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    collect_text(fragment.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
