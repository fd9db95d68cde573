/// Lexical analysis module for tokenizing Markdown input.
///
/// The `Lexer` walks the input once with a single forward cursor. Block-level
/// patterns are only tried at the logical start of a line; everything else is
/// inline punctuation or plain text. Tokenizing is total: input the rules do
/// not recognise degrades to `Text` or `Special` tokens.
mod position;
pub(crate) mod rules;
mod token;

pub use position::Position;
pub use token::{ListKind, Token, TokenKind};

use rules::SPECIAL_CHARS;

/// The main lexer struct for tokenizing Markdown input.
pub struct Lexer<'input> {
    input: &'input str,
    offset: usize,
    position: Position,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'input> Lexer<'input> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'input str) -> Self {
        Self::starting_at_line(input, 1)
    }

    /// Creates a lexer whose first line is numbered `line`.
    pub fn starting_at_line(input: &'input str, line: usize) -> Self {
        Lexer {
            input,
            offset: 0,
            position: Position::at_line(line),
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Returns the current position in the input.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Consumes the lexer, returning every token followed by `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        while self.offset < self.input.len() {
            self.step();
        }
        let position = self.position;
        self.tokens.push(Token::new(TokenKind::Eof, "", position));
        self.tokens
    }

    fn rest(&self) -> &'input str {
        &self.input[self.offset..]
    }

    fn emit(&mut self, kind: TokenKind, len: usize) {
        let text = &self.input[self.offset..self.offset + len];
        self.at_line_start = match kind {
            TokenKind::Newline => true,
            TokenKind::Space => self.at_line_start,
            _ => false,
        };
        self.tokens.push(Token::new(kind, text, self.position));
        self.position.advance(text);
        self.offset += len;
    }

    fn step(&mut self) {
        let rest = self.rest();
        let Some(first) = rest.chars().next() else {
            return;
        };

        if first == '\n' {
            self.emit(TokenKind::Newline, 1);
            return;
        }

        if first == ' ' || first == '\t' {
            let len = rest
                .find(|c: char| c != ' ' && c != '\t')
                .unwrap_or(rest.len());
            self.emit(TokenKind::Space, len);
            return;
        }

        if self.at_line_start && self.lex_block_marker(rest) {
            return;
        }

        if self.lex_inline(rest, first) {
            return;
        }

        self.lex_text(rest);
    }

    /// Header, fence, quote, rule, bullet, ordered: in that order.
    fn lex_block_marker(&mut self, rest: &'input str) -> bool {
        let consumed = |after: &str| rest.len() - after.len();

        if let Ok((after, level)) = rules::header_marker(rest) {
            self.emit(TokenKind::HeaderMarker { level }, consumed(after));
            return true;
        }

        if let Ok((after, fence)) = rules::code_fence(rest) {
            let kind = TokenKind::CodeFence {
                fence_char: fence.fence_char,
                fence_length: fence.length,
                info: fence.info.trim().to_string(),
            };
            self.emit(kind, consumed(after));
            return true;
        }

        if let Ok((after, _)) = rules::blockquote_marker(rest) {
            self.emit(TokenKind::BlockquoteMarker, consumed(after));
            return true;
        }

        if let Ok((after, _)) = rules::horizontal_rule(rest) {
            self.emit(TokenKind::HorizontalRule, consumed(after));
            return true;
        }

        if let Ok((after, marker)) = rules::bullet_marker(rest) {
            self.emit(
                TokenKind::ListMarker(ListKind::Bullet { marker }),
                consumed(after),
            );
            return true;
        }

        if let Ok((after, start)) = rules::ordered_marker(rest) {
            self.emit(
                TokenKind::ListMarker(ListKind::Ordered { start }),
                consumed(after),
            );
            return true;
        }

        false
    }

    fn lex_inline(&mut self, rest: &'input str, first: char) -> bool {
        match first {
            '\\' => {
                match rest[1..].chars().next() {
                    Some(escaped) if escaped != '\n' => {
                        self.emit(TokenKind::Escape { escaped }, 1 + escaped.len_utf8());
                    }
                    _ => self.emit(TokenKind::Text, 1),
                }
                true
            }
            '`' => {
                self.lex_backticks(rest);
                true
            }
            '<' => {
                self.lex_angle(rest);
                true
            }
            '!' if rest[1..].starts_with('[') => {
                self.emit(TokenKind::ImageStart, 2);
                true
            }
            '[' => {
                self.emit(TokenKind::LinkStart, 1);
                true
            }
            ']' => {
                match link_destination(rest) {
                    Some((url, len)) => self.emit(TokenKind::LinkEnd { url }, len),
                    None => self.emit(TokenKind::Special, 1),
                }
                true
            }
            '*' | '_' => {
                let count = run_length(rest, first);
                self.emit(
                    TokenKind::EmphasisMarker {
                        marker: first,
                        count,
                    },
                    count,
                );
                true
            }
            '~' => {
                let count = run_length(rest, '~');
                if count == 2 {
                    self.emit(TokenKind::EmphasisMarker { marker: '~', count }, 2);
                } else {
                    self.emit(TokenKind::Text, count);
                }
                true
            }
            c if SPECIAL_CHARS.contains(c) => {
                self.emit(TokenKind::Special, c.len_utf8());
                true
            }
            _ => false,
        }
    }

    /// A backtick run closed by a run of the same length on this line is a
    /// code span; an unmatched run stays literal.
    fn lex_backticks(&mut self, rest: &'input str) {
        let open = run_length(rest, '`');
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_end];

        let mut idx = open;
        while idx < line.len() {
            if line.as_bytes()[idx] == b'`' {
                let close = run_length(&line[idx..], '`');
                if close == open {
                    self.emit(TokenKind::CodeSpan, idx + close);
                    return;
                }
                idx += close;
            } else {
                idx += 1;
            }
        }
        self.emit(TokenKind::Text, open);
    }

    fn lex_angle(&mut self, rest: &'input str) {
        let stop = rest[1..]
            .find(|c: char| c == '>' || c == '<' || c.is_whitespace())
            .map(|idx| idx + 1);
        if let Some(close) = stop.filter(|&close| rest[close..].starts_with('>')) {
            let candidate = &rest[1..close];
            if !candidate.is_empty()
                && (rules::is_autolink_url(candidate) || rules::is_autolink_email(candidate))
            {
                self.emit(TokenKind::AutolinkStart, 1);
                self.emit(TokenKind::Text, candidate.len());
                self.emit(TokenKind::AutolinkEnd, 1);
                return;
            }
        }
        self.emit(TokenKind::Special, 1);
    }

    fn lex_text(&mut self, rest: &'input str) {
        let len = rest.find(is_text_stop).unwrap_or(rest.len());
        let len = if len == 0 {
            rest.chars().next().map_or(0, char::len_utf8)
        } else {
            len
        };
        if len > 0 {
            self.emit(TokenKind::Text, len);
        }
    }
}

/// Tokenizes `text` with line numbers starting at 1.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).tokenize()
}

/// Number of columns a run of leading spaces and tabs occupies, with tabs
/// advancing to the next multiple of four.
pub fn indent_width(whitespace: &str) -> usize {
    whitespace.chars().fold(0, |width, ch| match ch {
        '\t' => width + 4 - width % 4,
        ' ' => width + 1,
        _ => width,
    })
}

fn is_text_stop(c: char) -> bool {
    matches!(c, '\n' | ' ' | '\t' | '\\' | '<') || SPECIAL_CHARS.contains(c)
}

fn run_length(text: &str, ch: char) -> usize {
    text.chars().take_while(|&c| c == ch).count() * ch.len_utf8()
}

/// Parses `](destination)` on the current line. Returns the bare URL and the
/// byte length of the whole lexeme.
fn link_destination(rest: &str) -> Option<(String, usize)> {
    let after = rest.strip_prefix("](")?;
    let mut depth = 1usize;
    for (idx, ch) in after.char_indices() {
        match ch {
            '\n' => return None,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let inner = after[..idx].trim();
                    let url = inner.split_whitespace().next().unwrap_or("");
                    let url = url
                        .strip_prefix('<')
                        .and_then(|u| u.strip_suffix('>'))
                        .unwrap_or(url);
                    return Some((url.to_string(), 2 + idx + 1));
                }
            }
            _ => {}
        }
    }
    None
}
