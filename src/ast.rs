use crate::error::{MarkdownError, Result};
use crate::lexer::Position;

mod tree;

pub use tree::{NodeRef, to_json_like_tree};

/// Trait for visitor pattern support.
pub trait Visitable {
    /// Accept a visitor for immutable pre-order traversal.
    fn accept<V: Visitor>(&self, visitor: &mut V);
}

/// Visitor trait for immutable AST traversal. Every method defaults to a
/// no-op so implementors only override what they count or collect.
pub trait Visitor {
    fn visit_document(&mut self, _document: &Document) {}
    fn visit_block(&mut self, _block: &Block) {}
    fn visit_list_item(&mut self, _item: &ListItem) {}
    fn visit_inline(&mut self, _inline: &Inline) {}
}

/// Root document node containing the entire parsed Markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Block-level elements of the dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Paragraph containing inline elements
    Paragraph {
        content: Vec<Inline>,
        position: Option<Position>,
    },
    /// ATX header with level (1-6) and inline content
    Header {
        level: u8,
        content: Vec<Inline>,
        position: Option<Position>,
    },
    /// Fenced or indented code block; content is never re-parsed
    CodeBlock {
        content: String,
        language: Option<String>,
        fenced: bool,
        position: Option<Position>,
    },
    /// Blockquote containing nested blocks
    BlockQuote {
        children: Vec<Block>,
        position: Option<Position>,
    },
    /// Ordered or unordered list
    List {
        style: ListStyle,
        start_number: u64,
        /// First marker as written, without its trailing space (`-`, `3.`).
        marker: String,
        tight: bool,
        items: Vec<ListItem>,
        position: Option<Position>,
    },
    /// Thematic break, keeping the source line trimmed
    HorizontalRule {
        marker: String,
        position: Option<Position>,
    },
}

/// Orderedness of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Ordered,
    Unordered,
}

/// Individual list item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListItem {
    pub children: Vec<Block>,
}

/// Inline elements of the dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text content
    Text(String),
    Emphasis {
        kind: EmphasisKind,
        content: Vec<Inline>,
    },
    /// Link text never contains another link or image.
    Link {
        url: String,
        title: Option<String>,
        is_reference: bool,
        content: Vec<Inline>,
    },
    Image {
        url: String,
        alt_text: String,
        title: Option<String>,
    },
    /// Inline code span
    CodeSpan(String),
    Autolink {
        url: String,
        is_email: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmphasisKind {
    Italic,
    Bold,
    BoldItalic,
    Strikethrough,
}

impl EmphasisKind {
    /// Maps a delimiter run to its emphasis kind: `~~` or 1-3 of `*`/`_`.
    pub fn from_run(marker: char, count: usize) -> Option<Self> {
        match (marker, count) {
            ('~', 2) => Some(EmphasisKind::Strikethrough),
            ('*' | '_', 1) => Some(EmphasisKind::Italic),
            ('*' | '_', 2) => Some(EmphasisKind::Bold),
            ('*' | '_', 3) => Some(EmphasisKind::BoldItalic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmphasisKind::Italic => "italic",
            EmphasisKind::Bold => "bold",
            EmphasisKind::BoldItalic => "bold_italic",
            EmphasisKind::Strikethrough => "strikethrough",
        }
    }
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Document { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Count total blocks in a document, list items excluded.
    pub fn count_blocks(&self) -> usize {
        let mut counter = NodeCounter::default();
        self.accept(&mut counter);
        counter.blocks
    }

    /// Count total inline elements in a document.
    pub fn count_inlines(&self) -> usize {
        let mut counter = NodeCounter::default();
        self.accept(&mut counter);
        counter.inlines
    }
}

impl Block {
    pub fn paragraph(content: Vec<Inline>, position: Option<Position>) -> Self {
        Block::Paragraph { content, position }
    }

    /// Builds a header, rejecting levels outside `1..=6`.
    pub fn header(level: u8, content: Vec<Inline>, position: Option<Position>) -> Result<Self> {
        if !(1..=6).contains(&level) {
            return Err(MarkdownError::InvalidHeaderLevel { level });
        }
        Ok(Block::Header {
            level,
            content,
            position,
        })
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Block::Paragraph { position, .. }
            | Block::Header { position, .. }
            | Block::CodeBlock { position, .. }
            | Block::BlockQuote { position, .. }
            | Block::List { position, .. }
            | Block::HorizontalRule { position, .. } => *position,
        }
    }

    /// Inline children of paragraphs and headers; empty otherwise.
    pub fn inlines(&self) -> &[Inline] {
        match self {
            Block::Paragraph { content, .. } | Block::Header { content, .. } => content,
            _ => &[],
        }
    }
}

impl ListItem {
    pub fn new(children: Vec<Block>) -> Self {
        ListItem { children }
    }
}

impl Inline {
    pub fn text(content: impl Into<String>) -> Self {
        Inline::Text(content.into())
    }

    /// Child inlines of emphasis and links.
    pub fn children(&self) -> &[Inline] {
        match self {
            Inline::Emphasis { content, .. } | Inline::Link { content, .. } => content,
            _ => &[],
        }
    }

    /// Concatenated visible text, used for image alt text.
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(text) | Inline::CodeSpan(text) => out.push_str(text),
                Inline::Emphasis { content, .. } | Inline::Link { content, .. } => {
                    out.push_str(&Inline::plain_text(content))
                }
                Inline::Image { alt_text, .. } => out.push_str(alt_text),
                Inline::Autolink { url, .. } => out.push_str(url),
            }
        }
        out
    }
}

impl Visitable for Document {
    fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit_document(self);
        for block in &self.blocks {
            block.accept(visitor);
        }
    }
}

impl Visitable for Block {
    fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit_block(self);
        match self {
            Block::Paragraph { content, .. } | Block::Header { content, .. } => {
                for inline in content {
                    inline.accept(visitor);
                }
            }
            Block::BlockQuote { children, .. } => {
                for block in children {
                    block.accept(visitor);
                }
            }
            Block::List { items, .. } => {
                for item in items {
                    item.accept(visitor);
                }
            }
            Block::CodeBlock { .. } | Block::HorizontalRule { .. } => {}
        }
    }
}

impl Visitable for ListItem {
    fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit_list_item(self);
        for block in &self.children {
            block.accept(visitor);
        }
    }
}

impl Visitable for Inline {
    fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit_inline(self);
        for child in self.children() {
            child.accept(visitor);
        }
    }
}

#[derive(Default)]
struct NodeCounter {
    blocks: usize,
    inlines: usize,
}

impl Visitor for NodeCounter {
    fn visit_block(&mut self, _block: &Block) {
        self.blocks += 1;
    }

    fn visit_inline(&mut self, _inline: &Inline) {
        self.inlines += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(vec![
            Block::paragraph(
                vec![
                    Inline::text("a "),
                    Inline::Emphasis {
                        kind: EmphasisKind::Bold,
                        content: vec![Inline::text("b")],
                    },
                ],
                None,
            ),
            Block::List {
                style: ListStyle::Unordered,
                start_number: 1,
                marker: "-".to_string(),
                tight: true,
                items: vec![ListItem::new(vec![Block::paragraph(
                    vec![Inline::text("item")],
                    None,
                )])],
                position: None,
            },
        ])
    }

    #[test]
    fn test_header_level_validation() {
        assert!(Block::header(1, vec![], None).is_ok());
        assert!(Block::header(6, vec![], None).is_ok());
        assert_eq!(
            Block::header(7, vec![], None),
            Err(MarkdownError::InvalidHeaderLevel { level: 7 })
        );
        assert!(Block::header(0, vec![], None).is_err());
    }

    #[test]
    fn test_counts_walk_nested_nodes() {
        let document = sample();
        assert_eq!(document.count_blocks(), 3);
        assert_eq!(document.count_inlines(), 4);
    }

    #[test]
    fn test_emphasis_kind_from_run() {
        assert_eq!(EmphasisKind::from_run('*', 3), Some(EmphasisKind::BoldItalic));
        assert_eq!(EmphasisKind::from_run('_', 1), Some(EmphasisKind::Italic));
        assert_eq!(EmphasisKind::from_run('~', 2), Some(EmphasisKind::Strikethrough));
        assert_eq!(EmphasisKind::from_run('~', 1), None);
        assert_eq!(EmphasisKind::from_run('*', 4), None);
    }

    #[test]
    fn test_plain_text_flattens() {
        let inlines = vec![
            Inline::text("x "),
            Inline::Emphasis {
                kind: EmphasisKind::Italic,
                content: vec![Inline::CodeSpan("y".into())],
            },
        ];
        assert_eq!(Inline::plain_text(&inlines), "x y");
    }
}
