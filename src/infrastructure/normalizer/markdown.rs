//! Markdown to plain text conversion

use pulldown_cmark::{Event, Parser, Tag};

/// Strip markdown structure, keeping headings, paragraphs and list items as
/// plain text lines
pub fn markdown_to_text(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut text = String::new();
    let mut in_heading = false;
    let mut current_heading = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading(..)) => {
                in_heading = true;
                current_heading.clear();
            }
            Event::End(Tag::Heading(..)) => {
                if !text.is_empty() && !text.ends_with("\n\n") {
                    text.push_str("\n\n");
                }
                text.push_str(current_heading.trim());
                text.push_str("\n\n");
                in_heading = false;
                current_heading.clear();
            }
            Event::Text(t) | Event::Code(t) => {
                if in_heading {
                    current_heading.push_str(&t);
                } else {
                    text.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_heading {
                    current_heading.push(' ');
                } else {
                    text.push(' ');
                }
            }
            Event::End(Tag::Paragraph) => {
                text.push_str("\n\n");
            }
            Event::Start(Tag::Item) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(Tag::Item) => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(Tag::CodeBlock(_)) => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push('\n');
            }
            _ => {}
        }
    }

    text
}
