/// Engine configuration and the `MarkdownEngine` driver.
///
/// The engine wraps the parser and renderers with the policies a host needs:
/// an input size guard, strict versus lenient error handling, per-parse
/// statistics and a validation entry point that never fails.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ast::{Block, Document, Inline};
use crate::error::{ErrorInfo, ErrorSeverity, MarkdownError, Result};
use crate::parser::{Parser, ParserConfig};
use crate::render::{self, OutputFormat};

/// Default input size limit (1 MiB).
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1024 * 1024;

/// Main configuration struct for the Markdown engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parser configuration
    pub parser: ParserConfig,
    /// Inputs longer than this many bytes are rejected before tokenizing
    pub max_input_size: Option<usize>,
    /// Append a `[parse error: ...]` paragraph to error documents
    pub annotate_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            max_input_size: Some(DEFAULT_MAX_INPUT_SIZE),
            annotate_errors: false,
        }
    }
}

impl EngineConfig {
    /// Creates a builder for configuring the engine.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder for EngineConfig to provide a fluent configuration API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole parser configuration.
    pub fn parser(mut self, parser_config: ParserConfig) -> Self {
        self.config.parser = parser_config;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.parser.strict = strict;
        self
    }

    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.parser.max_nesting_depth = depth;
        self
    }

    /// Enables 4-space indented code blocks.
    pub fn indented_code_blocks(mut self, enabled: bool) -> Self {
        self.config.parser.ignore_indented_code_blocks = !enabled;
        self
    }

    pub fn preserve_leading_spaces(mut self, enabled: bool) -> Self {
        self.config.parser.preserve_leading_spaces = enabled;
        self
    }

    pub fn preserve_soft_line_breaks(mut self, enabled: bool) -> Self {
        self.config.parser.preserve_soft_line_breaks = enabled;
        self
    }

    /// Sets the input size limit; `None` disables the guard.
    pub fn max_input_size(mut self, max: Option<usize>) -> Self {
        self.config.max_input_size = max;
        self
    }

    pub fn annotate_errors(mut self, enabled: bool) -> Self {
        self.config.annotate_errors = enabled;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

/// Counters collected by one parse call. They never affect control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Tokens produced across the top-level and all nested tokenize passes.
    pub tokens_processed: usize,
    pub blocks_parsed: usize,
    pub inline_elements_parsed: usize,
    pub max_depth: usize,
    pub errors: Vec<ErrorInfo>,
}

/// A parsed document together with its statistics.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub document: Document,
    pub stats: ParseStats,
}

/// Result of [`MarkdownEngine::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Main Markdown engine: parse, render and validate with one configuration.
///
/// # Examples
///
/// ```
/// use markdown_dialect::{EngineConfig, MarkdownEngine, OutputFormat};
///
/// let engine = MarkdownEngine::with_config(
///     EngineConfig::builder()
///         .strict(true)
///         .max_nesting_depth(8)
///         .build(),
/// );
/// let html = engine.render_text("# Hello", OutputFormat::Html).unwrap();
/// assert_eq!(html, "<h1>Hello</h1>\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MarkdownEngine {
    config: EngineConfig,
    parser: Parser,
}

impl MarkdownEngine {
    /// Creates a new Markdown engine with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new Markdown engine with custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let parser = Parser::new(config.parser.clone());
        Self { config, parser }
    }

    /// Creates a builder for configuring the engine.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Returns a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses Markdown text into a document.
    ///
    /// Outside strict mode this only fails for errors no error document can
    /// stand in for.
    pub fn parse(&self, markdown: &str) -> Result<Document> {
        self.parse_with_stats(markdown).map(|output| output.document)
    }

    /// Parses Markdown text, also returning the parse statistics.
    pub fn parse_with_stats(&self, markdown: &str) -> Result<ParseOutput> {
        match self.try_parse(markdown) {
            Ok(output) => Ok(output),
            Err(error) if !self.config.parser.strict && error.is_recoverable() => {
                Ok(self.error_document(markdown, &error))
            }
            Err(error) => Err(error),
        }
    }

    /// Renders an already parsed document.
    pub fn render(&self, document: &Document, format: OutputFormat) -> Result<String> {
        render::render(document, format)
    }

    /// Parses and renders in one step.
    pub fn render_text(&self, markdown: &str, format: OutputFormat) -> Result<String> {
        let document = self.parse(markdown)?;
        self.render(&document, format)
    }

    /// Checks `markdown` with a strict parse. Never fails; the first error
    /// is reported as the single message.
    pub fn validate(&self, markdown: &str) -> ValidationReport {
        let strict = Parser::new(self.config.parser.clone().with_strict(true));
        let result = self
            .check_size(markdown)
            .and_then(|()| strict.parse(markdown));
        match result {
            Ok(_) => ValidationReport {
                valid: true,
                errors: Vec::new(),
            },
            Err(error) => {
                debug!(%error, "validation failed");
                ValidationReport {
                    valid: false,
                    errors: vec![error.to_string()],
                }
            }
        }
    }

    fn check_size(&self, markdown: &str) -> Result<()> {
        match self.config.max_input_size {
            Some(max) if markdown.len() > max => Err(MarkdownError::InputTooLarge {
                size: markdown.len(),
                max,
            }),
            _ => Ok(()),
        }
    }

    fn try_parse(&self, markdown: &str) -> Result<ParseOutput> {
        self.check_size(markdown)?;
        let outcome = self.parser.parse_detailed(markdown)?;
        let stats = ParseStats {
            tokens_processed: outcome.tokens_processed,
            blocks_parsed: outcome.document.count_blocks(),
            inline_elements_parsed: outcome.document.count_inlines(),
            max_depth: outcome.max_depth,
            errors: outcome.diagnostics,
        };
        Ok(ParseOutput {
            document: outcome.document,
            stats,
        })
    }

    /// Stand-in document holding the original text verbatim.
    fn error_document(&self, markdown: &str, error: &MarkdownError) -> ParseOutput {
        warn!(%error, "parse failed, returning error document");
        let mut blocks = vec![Block::paragraph(vec![Inline::text(markdown)], None)];
        if self.config.annotate_errors {
            blocks.push(Block::paragraph(
                vec![Inline::text(format!("[parse error: {error}]"))],
                None,
            ));
        }
        let document = Document::new(blocks);

        let mut info = ErrorInfo::new(ErrorSeverity::Error, error.to_string());
        if let Some(position) = error.position() {
            info = info.with_position(position);
        }
        let stats = ParseStats {
            blocks_parsed: document.count_blocks(),
            inline_elements_parsed: document.count_inlines(),
            errors: vec![info],
            ..ParseStats::default()
        };
        ParseOutput { document, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ListStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!(!config.parser.strict);
        assert_eq!(config.parser.max_nesting_depth, 32);
        assert_eq!(config.max_input_size, Some(DEFAULT_MAX_INPUT_SIZE));
        assert!(!config.annotate_errors);
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::builder()
            .strict(true)
            .max_nesting_depth(4)
            .indented_code_blocks(true)
            .preserve_soft_line_breaks(true)
            .max_input_size(None)
            .annotate_errors(true)
            .build();

        assert!(config.parser.strict);
        assert_eq!(config.parser.max_nesting_depth, 4);
        assert!(!config.parser.ignore_indented_code_blocks);
        assert!(config.parser.preserve_soft_line_breaks);
        assert!(!config.parser.preserve_leading_spaces);
        assert_eq!(config.max_input_size, None);
        assert!(config.annotate_errors);
    }

    #[test]
    fn test_engine_config_deserializes_partial_json() {
        let json = r#"{"parser": {"strict": true}, "annotate_errors": true}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.parser.strict);
        assert!(config.annotate_errors);
        assert_eq!(config.max_input_size, Some(DEFAULT_MAX_INPUT_SIZE));
    }

    #[test]
    fn test_parse_with_stats() {
        let engine = MarkdownEngine::new();
        let output = engine.parse_with_stats("# T\n\n- a *b*").unwrap();

        assert_eq!(output.stats.blocks_parsed, 3);
        assert_eq!(output.stats.inline_elements_parsed, 4);
        assert_eq!(output.stats.max_depth, 1);
        assert!(output.stats.tokens_processed > 0);
        assert!(output.stats.errors.is_empty());
        assert!(matches!(
            output.document.blocks[1],
            Block::List {
                style: ListStyle::Unordered,
                ..
            }
        ));
    }

    #[test]
    fn test_warnings_are_collected() {
        let engine = MarkdownEngine::new();
        let output = engine.parse_with_stats("```\nnever closed").unwrap();
        assert_eq!(output.stats.errors.len(), 1);
        assert_eq!(output.stats.errors[0].severity, ErrorSeverity::Warning);
    }

    #[test]
    fn test_nesting_limit_strict_and_lenient() {
        let lenient =
            MarkdownEngine::with_config(EngineConfig::builder().max_nesting_depth(1).build());
        let output = lenient.parse_with_stats("> > deep").unwrap();
        assert_eq!(output.stats.errors.len(), 1);
        assert_eq!(output.stats.errors[0].severity, ErrorSeverity::Error);

        let strict = MarkdownEngine::with_config(
            EngineConfig::builder()
                .max_nesting_depth(1)
                .strict(true)
                .build(),
        );
        assert!(matches!(
            strict.parse("> > deep"),
            Err(MarkdownError::Parse { .. })
        ));
    }

    #[test]
    fn test_oversized_input_becomes_error_document() {
        let engine = MarkdownEngine::with_config(
            EngineConfig::builder()
                .max_input_size(Some(4))
                .annotate_errors(true)
                .build(),
        );
        let output = engine.parse_with_stats("# too long").unwrap();
        assert_eq!(
            output.document,
            Document::new(vec![
                Block::paragraph(vec![Inline::text("# too long")], None),
                Block::paragraph(
                    vec![Inline::text(
                        "[parse error: Input of 10 bytes exceeds maximum allowed size of 4 bytes]"
                    )],
                    None
                ),
            ])
        );
        assert_eq!(output.stats.errors.len(), 1);

        let strict = MarkdownEngine::with_config(
            EngineConfig::builder()
                .max_input_size(Some(4))
                .strict(true)
                .build(),
        );
        assert_eq!(
            strict.parse("# too long"),
            Err(MarkdownError::InputTooLarge { size: 10, max: 4 })
        );
    }

    #[test]
    fn test_validate() {
        let engine =
            MarkdownEngine::with_config(EngineConfig::builder().max_nesting_depth(1).build());
        assert_eq!(
            engine.validate("# Valid heading"),
            ValidationReport {
                valid: true,
                errors: vec![]
            }
        );
        assert!(engine.validate("").valid);

        let report = engine.validate("> > too deep");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Parse error at line 1"));
    }

    #[test]
    fn test_render_text() {
        let engine = MarkdownEngine::new();
        assert_eq!(
            engine.render_text("*hi*", OutputFormat::Html).unwrap(),
            "<p><em>hi</em></p>\n"
        );
        assert_eq!(
            engine.render_text("*hi*", OutputFormat::MarkdownV2).unwrap(),
            "_hi_"
        );
        assert_eq!(
            engine.render_text("*hi*", OutputFormat::Markdown).unwrap(),
            "*hi*\n"
        );
    }
}
