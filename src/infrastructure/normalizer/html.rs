//! HTML to plain text conversion

use scraper::{ElementRef, Html, Selector};

/// Strip markup from an HTML document, skipping script/style content and
/// keeping block boundaries as line breaks
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let body_selector = Selector::parse("body").ok();
    let root = body_selector
        .as_ref()
        .and_then(|sel| document.select(sel).next());

    let text = match root {
        Some(body) => extract_element_text(&body),
        None => document.root_element().text().collect::<String>(),
    };

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_element_text(element: &ElementRef) -> String {
    let mut text = String::new();

    for node in element.children() {
        if let Some(el) = ElementRef::wrap(node) {
            let tag_name = el.value().name();

            if matches!(tag_name, "script" | "style" | "noscript" | "head") {
                continue;
            }

            if is_block_tag(tag_name) && !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }

            text.push_str(&extract_element_text(&el));

            if is_block_tag(tag_name) && !text.ends_with('\n') {
                text.push('\n');
            }
        } else if let Some(txt) = node.value().as_text() {
            text.push_str(txt);
        }
    }

    text
}

fn is_block_tag(tag_name: &str) -> bool {
    matches!(
        tag_name,
        "p" | "div"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "br"
            | "li"
            | "tr"
            | "td"
            | "th"
            | "table"
            | "ul"
            | "ol"
    )
}
