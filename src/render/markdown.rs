use super::{OutputFormat, Renderer, check_header_level};
use crate::ast::{Block, Document, EmphasisKind, Inline, ListStyle};
use crate::error::Result;
use crate::lexer::{ListKind, TokenKind, tokenize};

/// Characters escaped wherever they appear in text.
const ESCAPED: &[char] = &['\\', '`', '*', '_', '[', ']', '<', '~'];

/// Re-emits canonical Markdown. Rendering the parse of this output yields the
/// same string again.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn blocks(&self, blocks: &[Block]) -> Result<String> {
        let rendered = blocks
            .iter()
            .map(|block| self.block(block))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join("\n\n"))
    }

    fn block(&self, block: &Block) -> Result<String> {
        let rendered = match block {
            Block::Paragraph { content, .. } => self
                .inlines(content, &[], None)
                .split('\n')
                .map(escape_line_start)
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Header { level, content, .. } => {
                check_header_level(*level)?;
                let hashes = "#".repeat(usize::from(*level));
                let text = self.inlines(content, &[], None);
                format!("{hashes} {}", protect_closing_hashes(&text))
            }
            Block::CodeBlock {
                content, language, ..
            } => {
                let fence = "`".repeat((longest_run(content, '`') + 1).max(3));
                let language = language.as_deref().unwrap_or("");
                if content.is_empty() {
                    format!("{fence}{language}\n{fence}")
                } else {
                    format!("{fence}{language}\n{content}\n{fence}")
                }
            }
            Block::BlockQuote { children, .. } => {
                let inner = self.blocks(children)?;
                inner
                    .split('\n')
                    .map(|line| {
                        if line.is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {line}")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Block::List {
                style,
                start_number,
                tight,
                items,
                ..
            } => {
                let mut rendered = Vec::with_capacity(items.len());
                for (offset, item) in (0u64..).zip(items) {
                    let marker = match style {
                        ListStyle::Unordered => "-".to_string(),
                        ListStyle::Ordered => format!("{}.", start_number.saturating_add(offset)),
                    };
                    rendered.push(self.list_item(&marker, &item.children)?);
                }
                rendered.join(if *tight { "\n" } else { "\n\n" })
            }
            Block::HorizontalRule { .. } => "---".to_string(),
        };
        Ok(rendered)
    }

    /// Continuation lines sit at the marker width; a nested list after the
    /// item's first block sits at least three columns in.
    fn list_item(&self, marker: &str, children: &[Block]) -> Result<String> {
        let width = marker.len() + 1;
        let mut out = format!("{marker} ");
        for (idx, child) in children.iter().enumerate() {
            let indent = match child {
                Block::List { .. } if idx > 0 => " ".repeat(width.max(3)),
                _ => " ".repeat(width),
            };
            let body = self.block(child)?;
            for (line_idx, line) in body.split('\n').enumerate() {
                if idx == 0 && line_idx == 0 {
                    out.push_str(line);
                    continue;
                }
                if line_idx == 0 {
                    out.push('\n');
                }
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
            }
        }
        Ok(out)
    }

    /// `open` lists the delimiters of the enclosing emphasis nodes and
    /// `enclosing` the delimiter char directly around `inlines`.
    fn inlines(
        &self,
        inlines: &[Inline],
        open: &[(char, usize)],
        enclosing: Option<char>,
    ) -> String {
        let mut out = String::new();
        for (idx, inline) in inlines.iter().enumerate() {
            let rendered = match inline {
                Inline::Text(text) => escape_text(text),
                Inline::Emphasis {
                    kind: EmphasisKind::Strikethrough,
                    content,
                } => format!("~~{}~~", self.inlines(content, open, None)),
                Inline::Emphasis { kind, content } => {
                    let count = match kind {
                        EmphasisKind::Italic => 1,
                        EmphasisKind::Bold => 2,
                        EmphasisKind::BoldItalic | EmphasisKind::Strikethrough => 3,
                    };
                    let at_edge = idx == 0 || idx + 1 == inlines.len();
                    let touching = if at_edge { enclosing } else { None };
                    let marker =
                        emphasis_marker(&out, inlines.get(idx + 1), count, open, touching);
                    let delimiter = marker.to_string().repeat(count);
                    let mut nested = open.to_vec();
                    nested.push((marker, count));
                    format!(
                        "{delimiter}{}{delimiter}",
                        self.inlines(content, &nested, Some(marker))
                    )
                }
                Inline::Link {
                    url,
                    title,
                    content,
                    ..
                } => {
                    // A literal `!` must not turn the link into an image.
                    if out.ends_with('!') {
                        out.insert(out.len() - 1, '\\');
                    }
                    format!(
                        "[{}]({})",
                        self.inlines(content, open, None),
                        destination(url, title.as_deref())
                    )
                }
                Inline::Image {
                    url,
                    alt_text,
                    title,
                } => format!(
                    "![{}]({})",
                    escape_text(alt_text),
                    destination(url, title.as_deref())
                ),
                Inline::CodeSpan(code) => code_span(code),
                Inline::Autolink { url, .. } => format!("<{url}>"),
            };
            out.push_str(&rendered);
        }
        out
    }
}

/// Picks `*` or `_` for an emphasis run so that it never merges with an
/// adjacent run or closes an enclosing one early. `_` also has to sit on a
/// word boundary.
fn emphasis_marker(
    before: &str,
    next: Option<&Inline>,
    count: usize,
    open: &[(char, usize)],
    touching: Option<char>,
) -> char {
    let next_is_word = matches!(
        next,
        Some(Inline::Text(text)) if text.starts_with(char::is_alphanumeric)
    );
    ['*', '_']
        .into_iter()
        .find(|&marker| {
            let adjacent = touching == Some(marker) || before.ends_with(marker);
            let intraword =
                marker == '_' && (before.ends_with(char::is_alphanumeric) || next_is_word);
            !adjacent && !intraword && !open.contains(&(marker, count))
        })
        .unwrap_or('*')
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, document: &Document) -> Result<String> {
        let mut output = self.blocks(&document.blocks)?;
        if !output.is_empty() {
            output.push('\n');
        }
        Ok(output)
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if ESCAPED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes the first character of a paragraph line that would otherwise be
/// read back as a block marker.
fn escape_line_start(line: &str) -> String {
    let tokens = tokenize(line);
    let Some(lead) = tokens.iter().find(|t| !t.is_space()) else {
        return line.to_string();
    };
    let at = match &lead.kind {
        TokenKind::ListMarker(ListKind::Ordered { .. }) => {
            lead.position.offset + lead.text.find('.').unwrap_or(0)
        }
        _ if lead.starts_block() => lead.position.offset,
        _ => return line.to_string(),
    };
    let mut escaped = String::with_capacity(line.len() + 1);
    escaped.push_str(&line[..at]);
    escaped.push('\\');
    escaped.push_str(&line[at..]);
    escaped
}

/// Keeps trailing `#`s of header text from reading as a closing sequence.
fn protect_closing_hashes(text: &str) -> String {
    let trimmed = text.trim_end_matches('#');
    if trimmed.len() == text.len() {
        return text.to_string();
    }
    format!("{trimmed}\\{}", &text[trimmed.len()..])
}

fn destination(url: &str, title: Option<&str>) -> String {
    let url = if url.is_empty()
        || url
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>'))
    {
        format!("<{url}>")
    } else {
        url.to_string()
    };
    match title {
        Some(title) => format!(
            "{url} \"{}\"",
            title.replace('\\', "\\\\").replace('"', "\\\"")
        ),
        None => url,
    }
}

fn code_span(code: &str) -> String {
    let ticks = "`".repeat(longest_run(code, '`') + 1);
    let padded = code.starts_with('`')
        || code.ends_with('`')
        || (code.len() >= 2
            && code.starts_with(' ')
            && code.ends_with(' ')
            && code.chars().any(|c| c != ' '));
    if padded {
        format!("{ticks} {code} {ticks}")
    } else {
        format!("{ticks}{code}{ticks}")
    }
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn normalize(input: &str) -> String {
        MarkdownRenderer::new().render(&parse(input).unwrap()).unwrap()
    }

    #[test]
    fn test_canonical_blocks() {
        assert_eq!(
            normalize("Title\nnext line\n\n# Head #\n\n***\n\n* a\n* b"),
            "Title next line\n\n# Head\n\n---\n\n- a\n- b\n"
        );
    }

    #[test]
    fn test_ordered_list_numbers_from_start() {
        assert_eq!(normalize("7. a\n7. b\n\n7. c"), "7. a\n\n8. b\n\n9. c\n");
    }

    #[test]
    fn test_nested_list_indentation() {
        assert_eq!(
            normalize("1. A\n2. B\n   - B.1\n   - B.2"),
            "1. A\n2. B\n\n   - B.1\n   - B.2\n"
        );
    }

    #[test]
    fn test_nested_bullet_list_indents_three_columns() {
        let once = normalize("- a\n   - b");
        assert_eq!(once, "- a\n\n   - b\n");
        assert_eq!(normalize(&once), once);

        let once = normalize("- a\n\n  ```\n  x\n  ```");
        assert_eq!(once, "- a\n\n  ```\n  x\n  ```\n");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_adjacent_emphasis_alternates_delimiters() {
        for (input, expected) in [
            ("_a **b**_", "*a __b__*\n"),
            ("**a _b_**", "**a _b_**\n"),
            ("*a _b_ c*", "*a _b_ c*\n"),
            ("***a __b__***", "***a __b__***\n"),
        ] {
            let once = normalize(input);
            assert_eq!(once, expected, "normalizing {input:?}");
            assert_eq!(normalize(&once), once, "re-normalizing {input:?}");
        }
    }

    #[test]
    fn test_quote_and_code() {
        assert_eq!(
            normalize("> a\n>\n> ```\n> x ``` y\n> ```"),
            "> a\n>\n> ````\n> x ``` y\n> ````\n"
        );
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(normalize("\\# not a header"), "\\# not a header\n");
        assert_eq!(normalize("1\\. not a list"), "1\\. not a list\n");
        assert_eq!(normalize("snake\\_case \\*x\\*"), "snake\\_case \\*x\\*\n");
        assert_eq!(normalize("\\- item"), "\\- item\n");
    }

    #[test]
    fn test_inline_rendering() {
        assert_eq!(
            normalize("_i_ __b__ [t](<a b> \"q\") `` `c` `` <https://x.io>"),
            "*i* **b** [t](<a b> \"q\") `` `c` `` <https://x.io>\n"
        );
    }

    #[test]
    fn test_reference_link_becomes_inline() {
        assert_eq!(normalize("[x][r]\n\n[r]: /url"), "[x](/url)\n");
    }

    #[test]
    fn test_header_trailing_hash_is_protected() {
        assert_eq!(normalize("# C\\#"), "# C\\#\n");
        assert_eq!(normalize("# a \\#"), "# a \\#\n");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(normalize(""), "");
    }
}
