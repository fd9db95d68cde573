use serde::{Deserialize, Serialize};

/// Configuration for the parser behavior and options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Turn error-severity diagnostics into hard failures
    pub strict: bool,
    /// Maximum nesting depth of quotes and list items
    pub max_nesting_depth: usize,
    /// Treat 4-space indented lines as paragraph text instead of code
    pub ignore_indented_code_blocks: bool,
    /// Keep leading spaces of paragraph lines
    pub preserve_leading_spaces: bool,
    /// Keep single newlines inside paragraphs instead of joining with a space
    pub preserve_soft_line_breaks: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_nesting_depth: 32,
            ignore_indented_code_blocks: true,
            preserve_leading_spaces: false,
            preserve_soft_line_breaks: false,
        }
    }
}

impl ParserConfig {
    /// Options tuned for MarkdownV2 output, where layout must survive as
    /// literal newlines and spaces.
    pub fn markdown_v2() -> Self {
        Self {
            preserve_leading_spaces: true,
            preserve_soft_line_breaks: true,
            ..Self::default()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_indented_code_blocks(mut self, enabled: bool) -> Self {
        self.ignore_indented_code_blocks = !enabled;
        self
    }
}
