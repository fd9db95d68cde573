use std::iter;

use tracing::trace;

use super::config::ParserConfig;
use super::context::ParseContext;
use super::inline::InlineParser;
use super::lines::{Line, split_lines};
use crate::ast::{Block, Inline, ListItem, ListStyle};
use crate::error::{ErrorInfo, ErrorSeverity, Result};
use crate::lexer::{ListKind, Position, Token, TokenKind, rules};

/// Parses one token stream into blocks. Nested streams (quote and list item
/// content) come back through here one level deeper.
pub fn parse_block_tokens(tokens: &[Token], ctx: &mut ParseContext<'_>) -> Result<Vec<Block>> {
    BlockParser::new(tokens).parse(ctx)
}

struct BlockParser<'t> {
    lines: Vec<Line<'t>>,
    idx: usize,
}

/// Lines collected for one list item before it is parsed.
struct ItemDraft {
    line: usize,
    position: Position,
    content_indent: usize,
    lines: Vec<String>,
}

impl<'t> BlockParser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            lines: split_lines(tokens),
            idx: 0,
        }
    }

    fn current(&self) -> Option<Line<'t>> {
        self.lines.get(self.idx).copied()
    }

    fn parse(mut self, ctx: &mut ParseContext<'_>) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();

        while let Some(line) = self.current() {
            let Some(lead) = line.lead() else {
                self.idx += 1;
                continue;
            };

            if !ctx.config.ignore_indented_code_blocks && line.indent() >= 4 {
                blocks.push(self.indented_code(line));
                continue;
            }

            let block = match &lead.kind {
                TokenKind::HeaderMarker { level } => self.header(line, *level, ctx)?,
                TokenKind::CodeFence {
                    fence_char,
                    fence_length,
                    info,
                } => self.fenced_code(line, *fence_char, *fence_length, info, ctx)?,
                TokenKind::BlockquoteMarker => self.block_quote(line, ctx)?,
                TokenKind::HorizontalRule => {
                    self.idx += 1;
                    Block::HorizontalRule {
                        marker: lead.text.trim().to_string(),
                        position: Some(line.position()),
                    }
                }
                TokenKind::ListMarker(kind) => self.list(line, kind, ctx)?,
                _ => self.paragraph(line, ctx),
            };
            blocks.push(block);
        }

        Ok(blocks)
    }

    fn header(&mut self, line: Line<'t>, level: u8, ctx: &ParseContext<'_>) -> Result<Block> {
        self.idx += 1;
        let text = line.text_after_lead();
        let content = inline(ctx, strip_closing_sequence(text.trim()));
        Block::header(level, content, Some(line.position()))
    }

    fn fenced_code(
        &mut self,
        line: Line<'t>,
        fence_char: char,
        fence_length: usize,
        info: &str,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Block> {
        if let Some((at, run)) = rules::find_fence_run(info, fence_char, 3) {
            self.idx += 1;
            return malformed_fence(line, &info[..at], &info[at + run..], ctx);
        }

        let indent = line.indent();
        let body_start = self.idx + 1;
        let closer = (body_start..self.lines.len())
            .find(|&i| is_closing_fence(self.lines[i], fence_char, fence_length));

        let (end, next) = match closer {
            Some(close) => (close, close + 1),
            None => {
                let end = (body_start..self.lines.len())
                    .find(|&i| {
                        self.lines[i].lead().is_some_and(|t| {
                            matches!(
                                t.kind,
                                TokenKind::HeaderMarker { .. } | TokenKind::HorizontalRule
                            )
                        })
                    })
                    .unwrap_or(self.lines.len());
                ctx.report(
                    ErrorInfo::new(ErrorSeverity::Warning, "unterminated code fence")
                        .with_position(line.position()),
                )?;
                (end, end)
            }
        };

        let mut body: Vec<String> = self.lines[body_start..end]
            .iter()
            .map(|l| l.strip_indent(indent))
            .collect();
        if closer.is_none() {
            while body.last().is_some_and(|l| l.trim().is_empty()) {
                body.pop();
            }
        }
        self.idx = next;

        Ok(Block::CodeBlock {
            content: body.join("\n"),
            language: (!info.is_empty()).then(|| info.to_string()),
            fenced: true,
            position: Some(line.position()),
        })
    }

    fn indented_code(&mut self, first: Line<'t>) -> Block {
        let mut body = Vec::new();
        while let Some(line) = self.current() {
            if line.is_blank() {
                body.push(String::new());
            } else if line.indent() >= 4 {
                body.push(line.strip_indent(4));
            } else {
                break;
            }
            self.idx += 1;
        }
        while body.last().is_some_and(String::is_empty) {
            body.pop();
        }
        Block::CodeBlock {
            content: body.join("\n"),
            language: None,
            fenced: false,
            position: Some(first.position()),
        }
    }

    fn block_quote(&mut self, first: Line<'t>, ctx: &mut ParseContext<'_>) -> Result<Block> {
        let mut inner = Vec::new();
        while let Some(line) = self.current() {
            if !line
                .lead()
                .is_some_and(|t| matches!(t.kind, TokenKind::BlockquoteMarker))
            {
                break;
            }
            inner.push(line.text_after_lead());
            self.idx += 1;
        }

        let children = nested(&inner.join("\n"), first.number, first.position(), ctx)?;
        Ok(Block::BlockQuote {
            children,
            position: Some(first.position()),
        })
    }

    fn list(
        &mut self,
        first: Line<'t>,
        kind: &ListKind,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Block> {
        let base = first.indent();
        let ordered = kind.is_ordered();
        let start_number = match kind {
            ListKind::Ordered { start } => *start,
            ListKind::Bullet { .. } => 1,
        };
        let marker = first
            .lead()
            .map(|t| t.text.trim_end().to_string())
            .unwrap_or_default();

        let mut tight = true;
        let mut drafts: Vec<ItemDraft> = Vec::new();
        let mut open_fence: Option<(char, usize)> = None;

        while let Some(line) = self.current() {
            let content_indent = drafts.last().map_or(base, |d| d.content_indent);

            // Fenced lines belong to the item verbatim, until the fence closes
            // or an outdented block start ends the item.
            if let Some((fence_char, length)) = open_fence {
                let closes = |line: Line<'_>| {
                    let stripped = line.strip_indent(content_indent);
                    rules::is_fence_close(stripped.trim_start(), fence_char, length)
                };
                let outdented = |line: Line<'_>| line.indent() <= base && !closes(line);
                let gives_way = match line.lead() {
                    Some(lead) => lead.starts_block() && outdented(line),
                    None => self
                        .next_non_blank()
                        .is_none_or(|next| outdented(self.lines[next])),
                };

                if gives_way {
                    open_fence = None;
                } else {
                    if closes(line) {
                        open_fence = None;
                    }
                    if let Some(draft) = drafts.last_mut() {
                        draft.lines.push(line.strip_indent(content_indent));
                    }
                    self.idx += 1;
                    continue;
                }
            }

            let Some(lead) = line.lead() else {
                let Some(next) = self.next_non_blank() else {
                    break;
                };
                let next_line = self.lines[next];
                if is_sibling(next_line, base, ordered) {
                    tight = false;
                } else if next_line.indent() > base {
                    if let Some(draft) = drafts.last_mut() {
                        draft
                            .lines
                            .extend(iter::repeat_n(String::new(), next - self.idx));
                    }
                } else {
                    break;
                }
                self.idx = next;
                continue;
            };

            match &lead.kind {
                TokenKind::ListMarker(item_kind)
                    if line.indent() == base && item_kind.is_ordered() == ordered =>
                {
                    let text = line.text_after_lead();
                    let text = text.trim_start();
                    open_fence = rules::fence_opening(text);
                    drafts.push(ItemDraft {
                        line: line.number,
                        position: line.position(),
                        content_indent: base + lead.text.chars().count(),
                        lines: vec![text.to_string()],
                    });
                }
                TokenKind::ListMarker(_) if line.indent() <= base => break,
                _ if line.indent() > base => {
                    let stripped = line.strip_indent(content_indent);
                    open_fence = rules::fence_opening(stripped.trim_start());
                    if let Some(draft) = drafts.last_mut() {
                        draft.lines.push(stripped);
                    }
                }
                _ if lead.starts_block() => break,
                _ => {
                    // Lazy continuation of the item's paragraph.
                    if let Some(draft) = drafts.last_mut() {
                        draft.lines.push(line.text_from_lead());
                    }
                }
            }
            self.idx += 1;
        }

        let mut items = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let children = nested(&draft.lines.join("\n"), draft.line, draft.position, ctx)?;
            items.push(ListItem::new(children));
        }

        Ok(Block::List {
            style: if ordered {
                ListStyle::Ordered
            } else {
                ListStyle::Unordered
            },
            start_number,
            marker,
            tight,
            items,
            position: Some(first.position()),
        })
    }

    fn paragraph(&mut self, first: Line<'t>, ctx: &ParseContext<'_>) -> Block {
        let mut raw_lines = vec![first.raw()];
        self.idx += 1;
        while let Some(line) = self.current() {
            if line.is_blank() || line.lead().is_some_and(Token::starts_block) {
                break;
            }
            raw_lines.push(line.raw());
            self.idx += 1;
        }

        let text = join_paragraph_lines(raw_lines.iter().map(String::as_str), ctx.config);
        Block::paragraph(inline(ctx, &text), Some(first.position()))
    }

    fn next_non_blank(&self) -> Option<usize> {
        (self.idx..self.lines.len()).find(|&i| !self.lines[i].is_blank())
    }
}

fn inline(ctx: &ParseContext<'_>, text: &str) -> Vec<Inline> {
    InlineParser::new(ctx.references).parse(text)
}

/// Re-parses dequoted or item content one nesting level down. Past the
/// configured depth the content is flattened into a single paragraph.
fn nested(
    text: &str,
    first_line: usize,
    position: Position,
    ctx: &mut ParseContext<'_>,
) -> Result<Vec<Block>> {
    if ctx.at_depth_limit() {
        ctx.report(
            ErrorInfo::new(
                ErrorSeverity::Error,
                format!(
                    "maximum nesting depth of {} exceeded",
                    ctx.config.max_nesting_depth
                ),
            )
            .with_position(position),
        )?;
        trace!(line = position.line, "flattening content beyond nesting limit");
        let content = inline(ctx, &join_paragraph_lines(text.lines(), ctx.config));
        if content.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![Block::paragraph(content, Some(position))]);
    }

    let tokens = ctx.tokenize(text, first_line);
    ctx.enter();
    let result = parse_block_tokens(&tokens, ctx);
    ctx.leave();
    result
}

/// A fence whose info string holds another fence run, e.g. ```` ```x``` ````,
/// becomes a paragraph starting with an inline code span.
fn malformed_fence(
    line: Line<'_>,
    before: &str,
    after: &str,
    ctx: &mut ParseContext<'_>,
) -> Result<Block> {
    let (language, code) = split_language(before.trim());
    trace!(?language, line = line.number, "reinterpreting one-line fence as inline code");
    ctx.report(
        ErrorInfo::new(
            ErrorSeverity::Warning,
            "code fence closed on its opening line; treated as inline code",
        )
        .with_position(line.position()),
    )?;

    let mut content = vec![Inline::CodeSpan(code.to_string())];
    content.extend(inline(ctx, after.trim_end()));
    Ok(Block::paragraph(content, Some(line.position())))
}

/// Splits a leading language word off recovered fence content, when there is
/// more content after it.
fn split_language(text: &str) -> (Option<&str>, &str) {
    if let Some((word, rest)) = text.split_once(char::is_whitespace)
        && !rest.trim().is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
    {
        return (Some(word), rest.trim());
    }
    (None, text)
}

fn is_closing_fence(line: Line<'_>, fence_char: char, fence_length: usize) -> bool {
    line.lead().is_some_and(|t| match &t.kind {
        TokenKind::CodeFence {
            fence_char: c,
            fence_length: len,
            info,
        } => *c == fence_char && *len >= fence_length && info.is_empty(),
        _ => false,
    })
}

fn is_sibling(line: Line<'_>, base: usize, ordered: bool) -> bool {
    line.indent() == base
        && line.lead().is_some_and(|t| match &t.kind {
            TokenKind::ListMarker(kind) => kind.is_ordered() == ordered,
            _ => false,
        })
}

/// Strips an ATX closing sequence: trailing `#`s preceded by a space, or a
/// header made only of `#`s.
fn strip_closing_sequence(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.is_empty() {
        return "";
    }
    if without.len() != text.len() && without.ends_with([' ', '\t']) {
        return without.trim_end();
    }
    text
}

fn join_paragraph_lines<'l>(lines: impl Iterator<Item = &'l str>, config: &ParserConfig) -> String {
    let separator = if config.preserve_soft_line_breaks {
        "\n"
    } else {
        " "
    };
    lines
        .map(|line| {
            let line = line.trim_end();
            if config.preserve_leading_spaces {
                line
            } else {
                line.trim_start()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}
