//! Markdown dialect engine: a hand-written tokenizer, a two-phase block and
//! inline parser, and three renderers (HTML, normalized Markdown and the
//! Telegram MarkdownV2 dialect).

// Core modules
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod render;

// Configuration module for public API
pub mod config;

// Re-export key types for public API
pub use ast::{
    Block, Document, EmphasisKind, Inline, ListItem, ListStyle, NodeRef, Visitable, Visitor,
    to_json_like_tree,
};
pub use config::{
    EngineConfig, EngineConfigBuilder, MarkdownEngine, ParseOutput, ParseStats, ValidationReport,
};
pub use error::{ErrorInfo, ErrorSeverity, MarkdownError, Result};
pub use lexer::{Lexer, ListKind, Position, Token, TokenKind, tokenize};
pub use parser::{
    ParseOutcome, Parser, ParserConfig, parse, parse_blocks, parse_inline, parse_with_config,
};
pub use render::{
    HtmlRenderer, MarkdownRenderer, MarkdownV2Renderer, OutputFormat, Renderer, render,
};

/// Converts Markdown to HTML with the default configuration.
///
/// # Examples
///
/// ```
/// use markdown_dialect::to_html;
///
/// assert_eq!(to_html("**bold**"), "<p><strong>bold</strong></p>\n");
/// ```
pub fn to_html(markdown: &str) -> String {
    MarkdownEngine::new()
        .render_text(markdown, OutputFormat::Html)
        .unwrap_or_else(|_| render::HtmlWriter::escape_html(markdown))
}

/// Re-emits Markdown in canonical form.
pub fn to_markdown(markdown: &str) -> String {
    MarkdownEngine::new()
        .render_text(markdown, OutputFormat::Markdown)
        .unwrap_or_else(|_| markdown.to_string())
}

/// Converts Markdown to the Telegram MarkdownV2 dialect, keeping soft line
/// breaks and leading spaces.
///
/// # Examples
///
/// ```
/// use markdown_dialect::to_markdown_v2;
///
/// assert_eq!(to_markdown_v2("# Title!"), "\\# Title\\!");
/// ```
pub fn to_markdown_v2(markdown: &str) -> String {
    let config = EngineConfig::builder()
        .parser(ParserConfig::markdown_v2())
        .build();
    MarkdownEngine::with_config(config)
        .render_text(markdown, OutputFormat::MarkdownV2)
        .unwrap_or_else(|_| render::escape_text(markdown))
}

/// Validates `markdown` with a strict parse under default options.
pub fn validate(markdown: &str) -> ValidationReport {
    MarkdownEngine::new().validate(markdown)
}
