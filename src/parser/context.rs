use tracing::{trace, warn};

use super::config::ParserConfig;
use super::references::ReferenceMap;
use crate::error::{ErrorInfo, ErrorSeverity, Result};
use crate::lexer::{Lexer, Token};

/// Mutable state threaded through one parse call.
///
/// Holds the per-call reference table and the diagnostics collected so far.
/// Nothing in here outlives the call that created it.
pub struct ParseContext<'a> {
    pub config: &'a ParserConfig,
    pub references: &'a ReferenceMap,
    pub diagnostics: Vec<ErrorInfo>,
    /// Current nesting depth; the top-level block stream is depth 0.
    pub depth: usize,
    pub deepest: usize,
    pub tokens_processed: usize,
}

impl<'a> ParseContext<'a> {
    pub fn new(config: &'a ParserConfig, references: &'a ReferenceMap) -> Self {
        Self {
            config,
            references,
            diagnostics: Vec::new(),
            depth: 0,
            deepest: 0,
            tokens_processed: 0,
        }
    }

    /// Records a diagnostic. In strict mode an `Error` diagnostic aborts the
    /// parse; warnings never do.
    pub fn report(&mut self, info: ErrorInfo) -> Result<()> {
        let line = info.position.map(|p| p.line);
        match info.severity {
            ErrorSeverity::Error => {
                warn!(?line, message = %info.message, strict = self.config.strict, "parse error");
                if self.config.strict {
                    return Err(info.into_error());
                }
            }
            ErrorSeverity::Warning => {
                warn!(?line, message = %info.message, "recovered from malformed input");
            }
        }
        self.diagnostics.push(info);
        Ok(())
    }

    /// Tokenizes a nested stream whose first line is `line` in the input.
    pub fn tokenize(&mut self, text: &str, line: usize) -> Vec<Token> {
        let tokens = Lexer::starting_at_line(text, line).tokenize();
        self.tokens_processed += tokens.len();
        trace!(line, tokens = tokens.len(), "tokenized nested stream");
        tokens
    }

    /// True when another level of nesting would exceed the configured limit.
    pub fn at_depth_limit(&self) -> bool {
        self.depth >= self.config.max_nesting_depth
    }

    pub fn enter(&mut self) {
        self.depth += 1;
        self.deepest = self.deepest.max(self.depth);
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
