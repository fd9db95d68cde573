use unicode_segmentation::UnicodeSegmentation;

/// Represents the position of a token in the source text.
///
/// `line` and `column` are 1-based; columns count grapheme clusters so that
/// emoji and combining sequences occupy a single column. `offset` is the byte
/// offset into the string handed to the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new() -> Self {
        Self::at_line(1)
    }

    /// Start of the given line. Nested token streams use this so their
    /// positions keep the line numbers of the enclosing input.
    pub fn at_line(line: usize) -> Self {
        Self {
            line: line.max(1),
            column: 1,
            offset: 0,
        }
    }

    /// Moves past `consumed`, updating line and column counters.
    pub fn advance(&mut self, consumed: &str) {
        for grapheme in consumed.graphemes(true) {
            if grapheme == "\n" || grapheme == "\r\n" {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset += consumed.len();
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_graphemes_not_bytes() {
        let mut position = Position::new();
        position.advance("🌍👋 a");
        assert_eq!(position.line, 1);
        assert_eq!(position.column, 5);
        assert_eq!(position.offset, "🌍👋 a".len());
    }

    #[test]
    fn advance_resets_column_on_newline() {
        let mut position = Position::at_line(4);
        position.advance("ab\ncd");
        assert_eq!(position.line, 5);
        assert_eq!(position.column, 3);
    }

    #[test]
    fn at_line_clamps_to_first_line() {
        assert_eq!(Position::at_line(0).line, 1);
    }
}
