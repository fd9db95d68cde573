use std::borrow::Cow;

use super::position::Position;

/// Types of list markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    /// `-`, `*` or `+` followed by a space.
    Bullet { marker: char },
    /// `digits.` followed by a space.
    Ordered { start: u64 },
}

impl ListKind {
    pub fn is_ordered(&self) -> bool {
        matches!(self, ListKind::Ordered { .. })
    }
}

/// Token categories produced by the lexer.
///
/// Block-level kinds (`HeaderMarker` through `HorizontalRule`) are only
/// produced at the logical start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Run of characters with no Markdown meaning.
    Text,
    Newline,
    /// Run of spaces and tabs.
    Space,
    /// `#` to `######` plus the required space.
    HeaderMarker { level: u8 },
    /// Fence run plus the rest of the line (the info string).
    CodeFence {
        fence_char: char,
        fence_length: usize,
        info: String,
    },
    /// List marker including its trailing space.
    ListMarker(ListKind),
    /// `>` plus at most one following space.
    BlockquoteMarker,
    /// Whole thematic-break line.
    HorizontalRule,
    /// Run of `*`/`_`, or exactly two `~`.
    EmphasisMarker { marker: char, count: usize },
    LinkStart,
    /// `](destination)` captured as one token.
    LinkEnd { url: String },
    ImageStart,
    /// Backtick run, content and matching closing run.
    CodeSpan,
    AutolinkStart,
    AutolinkEnd,
    /// Backslash escape; `text` keeps the raw two characters.
    Escape { escaped: char },
    /// A single character from the special set with no other role.
    Special,
    Eof,
}

/// A lexeme with its kind and source position.
///
/// `text` always holds the raw source slice so that concatenating the texts
/// of a line reproduces that line exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Byte length of the raw lexeme.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Semantic content: the escaped character for escapes, the raw text
    /// otherwise.
    pub fn content(&self) -> Cow<'_, str> {
        match self.kind {
            TokenKind::Escape { escaped } => Cow::Owned(escaped.to_string()),
            _ => Cow::Borrowed(&self.text),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline)
    }

    pub fn is_space(&self) -> bool {
        matches!(self.kind, TokenKind::Space)
    }

    /// True for kinds that open a block other than a paragraph.
    pub fn starts_block(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::HeaderMarker { .. }
                | TokenKind::CodeFence { .. }
                | TokenKind::ListMarker(_)
                | TokenKind::BlockquoteMarker
                | TokenKind::HorizontalRule
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_content_drops_backslash() {
        let token = Token::new(TokenKind::Escape { escaped: '*' }, "\\*", Position::new());
        assert_eq!(token.content(), "*");
        assert_eq!(token.text, "\\*");
        assert_eq!(token.len(), 2);
    }

    #[test]
    fn block_kinds_start_blocks() {
        let header = Token::new(TokenKind::HeaderMarker { level: 2 }, "## ", Position::new());
        let text = Token::new(TokenKind::Text, "hello", Position::new());
        assert!(header.starts_block());
        assert!(!text.starts_block());
        assert_eq!(text.content(), "hello");
    }
}
