use crate::lexer::{Position, Token, indent_width};

/// One source line of a token stream, without its terminating newline.
#[derive(Debug, Clone, Copy)]
pub struct Line<'t> {
    pub tokens: &'t [Token],
    pub number: usize,
}

impl<'t> Line<'t> {
    /// First token that is not leading whitespace.
    pub fn lead(&self) -> Option<&'t Token> {
        self.tokens.iter().find(|t| !t.is_space())
    }

    fn lead_index(&self) -> usize {
        self.tokens
            .iter()
            .position(|t| !t.is_space())
            .unwrap_or(self.tokens.len())
    }

    /// Indentation of the line in columns.
    pub fn indent(&self) -> usize {
        match self.tokens.first() {
            Some(token) if token.is_space() => indent_width(&token.text),
            _ => 0,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.tokens.iter().all(Token::is_space)
    }

    pub fn position(&self) -> Position {
        self.tokens
            .first()
            .map(|t| t.position)
            .unwrap_or_else(|| Position::at_line(self.number))
    }

    /// The line exactly as written.
    pub fn raw(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Everything after the lead token.
    pub fn text_after_lead(&self) -> String {
        let start = (self.lead_index() + 1).min(self.tokens.len());
        self.tokens[start..].iter().map(|t| t.text.as_str()).collect()
    }

    /// Everything from the lead token on, i.e. the line minus its indentation.
    pub fn text_from_lead(&self) -> String {
        self.tokens[self.lead_index()..]
            .iter()
            .map(|t| t.text.as_str())
            .collect()
    }

    /// The raw line with up to `columns` columns of leading whitespace removed.
    pub fn strip_indent(&self, columns: usize) -> String {
        let raw = self.raw();
        let mut width = 0;
        let mut cut = 0;
        for (idx, ch) in raw.char_indices() {
            if width >= columns {
                break;
            }
            match ch {
                ' ' => width += 1,
                '\t' => width += 4 - width % 4,
                _ => break,
            }
            cut = idx + ch.len_utf8();
        }
        raw[cut..].to_string()
    }
}

/// Splits a token stream into lines at `Newline` tokens. The trailing `Eof`
/// is dropped.
pub fn split_lines(tokens: &[Token]) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (idx, token) in tokens.iter().enumerate() {
        if token.is_newline() || token.is_eof() {
            lines.push(Line {
                tokens: &tokens[start..idx],
                number: token.line(),
            });
            start = idx + 1;
        }
    }
    lines
}
