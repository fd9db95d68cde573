use super::{OutputFormat, Renderer, check_header_level};
use crate::ast::{Block, Document, EmphasisKind, Inline, ListItem, ListStyle};
use crate::error::Result;

/// Low-level HTML writing utilities with proper escaping
#[derive(Debug, Default)]
pub struct HtmlWriter {
    buffer: String,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes plain text content, escaped
    pub fn write_text(&mut self, text: &str) {
        self.buffer.push_str(&Self::escape_html(text));
    }

    /// Writes raw HTML content without escaping
    pub fn write_raw(&mut self, html: &str) {
        self.buffer.push_str(html);
    }

    /// Writes an opening tag; attributes with `None` values are skipped
    pub fn write_opening_tag(&mut self, tag: &str, attributes: &[(&str, Option<&str>)]) {
        self.buffer.push('<');
        self.buffer.push_str(tag);
        for (key, value) in attributes {
            if let Some(value) = value {
                self.buffer.push(' ');
                self.buffer.push_str(key);
                self.buffer.push_str("=\"");
                self.buffer.push_str(&Self::escape_html(value));
                self.buffer.push('"');
            }
        }
        self.buffer.push('>');
    }

    /// Writes a closing tag
    pub fn write_closing_tag(&mut self, tag: &str) {
        self.buffer.push_str("</");
        self.buffer.push_str(tag);
        self.buffer.push('>');
    }

    pub fn newline(&mut self) {
        self.buffer.push('\n');
    }

    /// Escapes HTML special characters in text and attribute values
    pub fn escape_html(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '&' => escaped.push_str("&amp;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#x27;"),
                c => escaped.push(c),
            }
        }
        escaped
    }

    pub fn into_output(self) -> String {
        self.buffer
    }
}

/// Renders documents as HTML fragments, one block element per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    fn block(&self, block: &Block, writer: &mut HtmlWriter) -> Result<()> {
        match block {
            Block::Paragraph { content, .. } => {
                writer.write_opening_tag("p", &[]);
                self.inlines(content, writer);
                writer.write_closing_tag("p");
            }
            Block::Header { level, content, .. } => {
                check_header_level(*level)?;
                let tag = format!("h{level}");
                writer.write_opening_tag(&tag, &[]);
                self.inlines(content, writer);
                writer.write_closing_tag(&tag);
            }
            Block::CodeBlock {
                content, language, ..
            } => {
                let class = language
                    .as_deref()
                    .and_then(|l| l.split_whitespace().next())
                    .map(|l| format!("language-{l}"));
                writer.write_opening_tag("pre", &[]);
                writer.write_opening_tag("code", &[("class", class.as_deref())]);
                writer.write_text(content);
                if !content.is_empty() {
                    writer.newline();
                }
                writer.write_closing_tag("code");
                writer.write_closing_tag("pre");
            }
            Block::BlockQuote { children, .. } => {
                writer.write_opening_tag("blockquote", &[]);
                writer.newline();
                for child in children {
                    self.block(child, writer)?;
                }
                writer.write_closing_tag("blockquote");
            }
            Block::List {
                style,
                start_number,
                tight,
                items,
                ..
            } => {
                let (tag, start) = match style {
                    ListStyle::Ordered => (
                        "ol",
                        (*start_number != 1).then(|| start_number.to_string()),
                    ),
                    ListStyle::Unordered => ("ul", None),
                };
                writer.write_opening_tag(tag, &[("start", start.as_deref())]);
                writer.newline();
                for item in items {
                    self.list_item(item, *tight, writer)?;
                }
                writer.write_closing_tag(tag);
            }
            Block::HorizontalRule { .. } => writer.write_raw("<hr>"),
        }
        writer.newline();
        Ok(())
    }

    /// Tight lists drop the `<p>` around the item's only paragraph.
    fn list_item(&self, item: &ListItem, tight: bool, writer: &mut HtmlWriter) -> Result<()> {
        writer.write_opening_tag("li", &[]);
        let paragraphs = item
            .children
            .iter()
            .filter(|b| matches!(b, Block::Paragraph { .. }))
            .count();
        let unwrap = tight && paragraphs == 1;

        for (idx, child) in item.children.iter().enumerate() {
            match child {
                Block::Paragraph { content, .. } if unwrap => {
                    self.inlines(content, writer);
                    if idx + 1 < item.children.len() {
                        writer.newline();
                    }
                }
                _ => {
                    if idx == 0 {
                        writer.newline();
                    }
                    self.block(child, writer)?;
                }
            }
        }
        writer.write_closing_tag("li");
        writer.newline();
        Ok(())
    }

    fn inlines(&self, inlines: &[Inline], writer: &mut HtmlWriter) {
        for inline in inlines {
            self.inline(inline, writer);
        }
    }

    fn inline(&self, inline: &Inline, writer: &mut HtmlWriter) {
        match inline {
            Inline::Text(text) => writer.write_text(text),
            Inline::Emphasis { kind, content } => {
                let tags: &[&str] = match kind {
                    EmphasisKind::Italic => &["em"],
                    EmphasisKind::Bold => &["strong"],
                    EmphasisKind::BoldItalic => &["strong", "em"],
                    EmphasisKind::Strikethrough => &["del"],
                };
                for tag in tags {
                    writer.write_opening_tag(tag, &[]);
                }
                self.inlines(content, writer);
                for tag in tags.iter().rev() {
                    writer.write_closing_tag(tag);
                }
            }
            Inline::Link {
                url,
                title,
                content,
                ..
            } => {
                writer.write_opening_tag(
                    "a",
                    &[("href", Some(url.as_str())), ("title", title.as_deref())],
                );
                self.inlines(content, writer);
                writer.write_closing_tag("a");
            }
            Inline::Image {
                url,
                alt_text,
                title,
            } => {
                writer.write_opening_tag(
                    "img",
                    &[
                        ("src", Some(url.as_str())),
                        ("alt", Some(alt_text.as_str())),
                        ("title", title.as_deref()),
                    ],
                );
            }
            Inline::CodeSpan(code) => {
                writer.write_opening_tag("code", &[]);
                writer.write_text(code);
                writer.write_closing_tag("code");
            }
            Inline::Autolink { url, is_email } => {
                let href = if *is_email {
                    format!("mailto:{url}")
                } else {
                    url.clone()
                };
                writer.write_opening_tag("a", &[("href", Some(href.as_str()))]);
                writer.write_text(url);
                writer.write_closing_tag("a");
            }
        }
    }
}

impl Renderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render(&self, document: &Document) -> Result<String> {
        let mut writer = HtmlWriter::new();
        for block in &document.blocks {
            self.block(block, &mut writer)?;
        }
        Ok(writer.into_output())
    }
}
