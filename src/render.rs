//! Output backends. Each renderer is a pure function of the document: it
//! walks the tree with an exhaustive match and never mutates it.
mod html;
mod markdown;
mod markdown_v2;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use html::{HtmlRenderer, HtmlWriter};
pub use markdown::MarkdownRenderer;
pub use markdown_v2::{MarkdownV2Renderer, escape_code, escape_link_url, escape_text};

use crate::ast::Document;
use crate::error::{MarkdownError, Result};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Html,
    /// Normalized Markdown, stable under re-parsing.
    Markdown,
    /// Fully escaped Telegram dialect.
    #[serde(rename = "markdown_v2")]
    MarkdownV2,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Html => "HTML",
            OutputFormat::Markdown => "Markdown",
            OutputFormat::MarkdownV2 => "MarkdownV2",
        })
    }
}

/// Common interface of the output backends.
pub trait Renderer {
    fn format(&self) -> OutputFormat;

    fn render(&self, document: &Document) -> Result<String>;
}

/// Returns the renderer for `format`.
pub fn renderer_for(format: OutputFormat) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Html => Box::new(HtmlRenderer::new()),
        OutputFormat::Markdown => Box::new(MarkdownRenderer::new()),
        OutputFormat::MarkdownV2 => Box::new(MarkdownV2Renderer::new()),
    }
}

/// Renders `document` in the requested format.
pub fn render(document: &Document, format: OutputFormat) -> Result<String> {
    renderer_for(format).render(document)
}

pub(crate) fn check_header_level(level: u8) -> Result<()> {
    if (1..=6).contains(&level) {
        Ok(())
    } else {
        Err(MarkdownError::InvalidHeaderLevel { level })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Inline};

    #[test]
    fn format_display_and_serde() {
        assert_eq!(OutputFormat::Html.to_string(), "HTML");
        assert_eq!(
            serde_json::to_string(&OutputFormat::MarkdownV2).unwrap(),
            "\"markdown_v2\""
        );
        let parsed: OutputFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(parsed, OutputFormat::Markdown);
    }

    #[test]
    fn every_renderer_rejects_bad_header_level() {
        let document = Document::new(vec![Block::Header {
            level: 7,
            content: vec![Inline::text("x")],
            position: None,
        }]);
        for format in [
            OutputFormat::Html,
            OutputFormat::Markdown,
            OutputFormat::MarkdownV2,
        ] {
            let renderer = renderer_for(format);
            assert_eq!(renderer.format(), format);
            assert_eq!(
                renderer.render(&document),
                Err(MarkdownError::InvalidHeaderLevel { level: 7 })
            );
        }
    }
}
