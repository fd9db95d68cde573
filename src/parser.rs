// Block and inline parsing, split by concern
mod block;
mod config;
mod context;
mod inline;
mod lines;
mod references;


use std::borrow::Cow;

use tracing::debug;

pub use config::ParserConfig;
pub use context::ParseContext;
pub use inline::{InlineParser, parse_inline};
pub use references::{LinkReference, ReferenceMap, extract_references, normalize_label};

use crate::ast::Document;
use crate::error::{ErrorInfo, Result};
use crate::lexer::{Lexer, Token};

/// Everything one parse produced besides the document itself.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub document: Document,
    pub diagnostics: Vec<ErrorInfo>,
    pub tokens_processed: usize,
    pub max_depth: usize,
}

/// Two-phase Markdown parser: blocks from the token stream, then inlines
/// from each block's flattened text.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse(&self, markdown: &str) -> Result<Document> {
        self.parse_detailed(markdown).map(|outcome| outcome.document)
    }

    /// Parses `markdown`, also returning diagnostics and counters.
    pub fn parse_detailed(&self, markdown: &str) -> Result<ParseOutcome> {
        let text = normalize_line_endings(markdown);
        let (text, references) = extract_references(&text);
        let tokens = Lexer::new(&text).tokenize();

        let mut ctx = ParseContext::new(&self.config, &references);
        ctx.tokens_processed = tokens.len();
        let blocks = block::parse_block_tokens(&tokens, &mut ctx)?;
        let document = Document::new(blocks);

        debug!(
            tokens = ctx.tokens_processed,
            blocks = document.count_blocks(),
            inlines = document.count_inlines(),
            references = references.len(),
            max_depth = ctx.deepest,
            diagnostics = ctx.diagnostics.len(),
            "parsed markdown document"
        );

        Ok(ParseOutcome {
            document,
            tokens_processed: ctx.tokens_processed,
            max_depth: ctx.deepest,
            diagnostics: ctx.diagnostics,
        })
    }
}

/// Parse Markdown using the default parser configuration.
pub fn parse(markdown: &str) -> Result<Document> {
    Parser::with_defaults().parse(markdown)
}

/// Parse function with custom configuration.
pub fn parse_with_config(markdown: &str, config: &ParserConfig) -> Result<Document> {
    Parser::new(config.clone()).parse(markdown)
}

/// Block-parses an already tokenized stream with default options and no
/// reference definitions.
pub fn parse_blocks(tokens: &[Token]) -> Result<Document> {
    let config = ParserConfig::default();
    let references = ReferenceMap::new();
    let mut ctx = ParseContext::new(&config, &references);
    block::parse_block_tokens(tokens, &mut ctx).map(Document::new)
}

/// Converts `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}
