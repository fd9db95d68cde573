use once_cell::sync::Lazy;
use regex::Regex;

use super::{OutputFormat, Renderer, check_header_level};
use crate::ast::{Block, Document, EmphasisKind, Inline, ListItem, ListStyle};
use crate::error::Result;
use crate::lexer::rules::SPECIAL_CHARS;

static CUSTOM_EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tg://emoji\?id=\d+$").expect("valid custom emoji pattern"));

const NESTED_INDENT: &str = "  ";

/// Escapes every MarkdownV2 special character in plain text.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if c == '\\' || SPECIAL_CHARS.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escaping for the inside of code spans and code blocks.
pub fn escape_code(code: &str) -> String {
    escape_only(code, &['\\', '`'])
}

/// Escaping for the URL part of an inline link.
pub fn escape_link_url(url: &str) -> String {
    escape_only(url, &['\\', ')'])
}

fn escape_only(text: &str, set: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if set.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Renders the Telegram MarkdownV2 dialect. The dialect has no headers,
/// lists or images, so those degrade to escaped text and links.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownV2Renderer;

impl MarkdownV2Renderer {
    pub fn new() -> Self {
        Self
    }

    fn blocks(&self, blocks: &[Block], separator: &str) -> Result<String> {
        let rendered = blocks
            .iter()
            .map(|block| self.block(block))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(separator))
    }

    fn block(&self, block: &Block) -> Result<String> {
        let rendered = match block {
            Block::Paragraph { content, .. } => self.inlines(content),
            Block::Header { level, content, .. } => {
                check_header_level(*level)?;
                format!(
                    "{} {}",
                    "\\#".repeat(usize::from(*level)),
                    self.inlines(content)
                )
            }
            Block::CodeBlock {
                content, language, ..
            } => {
                let language = language
                    .as_deref()
                    .and_then(|l| l.split_whitespace().next())
                    .unwrap_or("");
                format!("```{language}\n{}\n```", escape_code(content))
            }
            Block::BlockQuote { children, .. } => self
                .blocks(children, "\n\n")?
                .split('\n')
                .map(|line| format!(">{line}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::List {
                style,
                start_number,
                items,
                ..
            } => {
                let mut rendered = Vec::with_capacity(items.len());
                for (offset, item) in (0u64..).zip(items) {
                    let marker = match style {
                        ListStyle::Unordered => "•".to_string(),
                        ListStyle::Ordered => {
                            format!("{}\\.", start_number.saturating_add(offset))
                        }
                    };
                    rendered.push(self.list_item(&marker, item)?);
                }
                rendered.join("\n")
            }
            Block::HorizontalRule { .. } => "\\-\\-\\-".to_string(),
        };
        Ok(rendered)
    }

    fn list_item(&self, marker: &str, item: &ListItem) -> Result<String> {
        let body = self.blocks(&item.children, "\n")?;
        let mut lines = body.split('\n');
        let mut out = format!("{marker} {}", lines.next().unwrap_or(""));
        for line in lines {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(NESTED_INDENT);
                out.push_str(line);
            }
        }
        Ok(out.trim_end_matches(' ').to_string())
    }

    fn inlines(&self, inlines: &[Inline]) -> String {
        inlines.iter().map(|inline| self.inline(inline)).collect()
    }

    fn inline(&self, inline: &Inline) -> String {
        match inline {
            Inline::Text(text) => escape_text(text),
            Inline::Emphasis { kind, content } => {
                let inner = self.inlines(content);
                match kind {
                    EmphasisKind::Italic => format!("_{inner}_"),
                    EmphasisKind::Bold => format!("*{inner}*"),
                    EmphasisKind::BoldItalic => format!("*_{inner}_*"),
                    EmphasisKind::Strikethrough => format!("~{inner}~"),
                }
            }
            Inline::Link { url, content, .. } => {
                format!("[{}]({})", self.inlines(content), escape_link_url(url))
            }
            Inline::Image { url, alt_text, .. } => {
                if CUSTOM_EMOJI.is_match(url) {
                    format!("![{}]({url})", escape_text(alt_text))
                } else {
                    let label = if alt_text.is_empty() { url } else { alt_text };
                    format!("[{}]({})", escape_text(label), escape_link_url(url))
                }
            }
            Inline::CodeSpan(code) => format!("`{}`", escape_code(code)),
            Inline::Autolink { url, is_email } => {
                if *is_email {
                    escape_text(url)
                } else {
                    format!("[{}]({})", escape_text(url), escape_link_url(url))
                }
            }
        }
    }
}

impl Renderer for MarkdownV2Renderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::MarkdownV2
    }

    fn render(&self, document: &Document) -> Result<String> {
        self.blocks(&document.blocks, "\n\n")
    }
}
