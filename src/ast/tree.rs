use serde_json::{Map, Value, json};

use super::{Block, Document, Inline, ListItem, ListStyle};

/// Borrowed handle to any node in a tree, used for generic traversal and
/// introspection. Nodes never point back at their parent; walk down from
/// the document instead.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    Block(&'a Block),
    ListItem(&'a ListItem),
    Inline(&'a Inline),
}

impl<'a> NodeRef<'a> {
    /// Stable snake_case name of the node variant.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Document(_) => "document",
            NodeRef::Block(block) => match block {
                Block::Paragraph { .. } => "paragraph",
                Block::Header { .. } => "header",
                Block::CodeBlock { .. } => "code_block",
                Block::BlockQuote { .. } => "block_quote",
                Block::List { .. } => "list",
                Block::HorizontalRule { .. } => "horizontal_rule",
            },
            NodeRef::ListItem(_) => "list_item",
            NodeRef::Inline(inline) => match inline {
                Inline::Text(_) => "text",
                Inline::Emphasis { .. } => "emphasis",
                Inline::Link { .. } => "link",
                Inline::Image { .. } => "image",
                Inline::CodeSpan(_) => "code_span",
                Inline::Autolink { .. } => "autolink",
            },
        }
    }

    /// Direct children in document order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            NodeRef::Document(document) => document.blocks.iter().map(NodeRef::Block).collect(),
            NodeRef::Block(block) => match block {
                Block::Paragraph { content, .. } | Block::Header { content, .. } => {
                    content.iter().map(NodeRef::Inline).collect()
                }
                Block::BlockQuote { children, .. } => children.iter().map(NodeRef::Block).collect(),
                Block::List { items, .. } => items.iter().map(NodeRef::ListItem).collect(),
                Block::CodeBlock { .. } | Block::HorizontalRule { .. } => Vec::new(),
            },
            NodeRef::ListItem(item) => item.children.iter().map(NodeRef::Block).collect(),
            NodeRef::Inline(inline) => inline.children().iter().map(NodeRef::Inline).collect(),
        }
    }

    /// True for variants that can hold children, even when they are empty.
    pub fn is_container(&self) -> bool {
        match self {
            NodeRef::Document(_) | NodeRef::ListItem(_) => true,
            NodeRef::Block(block) => !matches!(
                block,
                Block::CodeBlock { .. } | Block::HorizontalRule { .. }
            ),
            NodeRef::Inline(inline) => {
                matches!(inline, Inline::Emphasis { .. } | Inline::Link { .. })
            }
        }
    }

    fn attributes(&self) -> Map<String, Value> {
        let attrs = match *self {
            NodeRef::Block(Block::Header { level, .. }) => json!({ "level": level }),
            NodeRef::Block(Block::CodeBlock {
                content,
                language,
                fenced,
                ..
            }) => json!({ "content": content, "language": language, "fenced": fenced }),
            NodeRef::Block(Block::List {
                style,
                start_number,
                marker,
                tight,
                ..
            }) => json!({
                "ordered": *style == ListStyle::Ordered,
                "start_number": start_number,
                "marker": marker,
                "tight": tight,
            }),
            NodeRef::Block(Block::HorizontalRule { marker, .. }) => json!({ "marker": marker }),
            NodeRef::Inline(Inline::Text(content)) | NodeRef::Inline(Inline::CodeSpan(content)) => {
                json!({ "content": content })
            }
            NodeRef::Inline(Inline::Emphasis { kind, .. }) => json!({ "kind": kind.as_str() }),
            NodeRef::Inline(Inline::Link {
                url,
                title,
                is_reference,
                ..
            }) => json!({ "url": url, "title": title, "is_reference": is_reference }),
            NodeRef::Inline(Inline::Image {
                url,
                alt_text,
                title,
            }) => json!({ "url": url, "alt_text": alt_text, "title": title }),
            NodeRef::Inline(Inline::Autolink { url, is_email }) => {
                json!({ "url": url, "is_email": is_email })
            }
            _ => json!({}),
        };
        match attrs {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl<'a> From<&'a Document> for NodeRef<'a> {
    fn from(document: &'a Document) -> Self {
        NodeRef::Document(document)
    }
}

impl<'a> From<&'a Block> for NodeRef<'a> {
    fn from(block: &'a Block) -> Self {
        NodeRef::Block(block)
    }
}

impl<'a> From<&'a ListItem> for NodeRef<'a> {
    fn from(item: &'a ListItem) -> Self {
        NodeRef::ListItem(item)
    }
}

impl<'a> From<&'a Inline> for NodeRef<'a> {
    fn from(inline: &'a Inline) -> Self {
        NodeRef::Inline(inline)
    }
}

/// Converts a node and its subtree into nested JSON objects of the form
/// `{"type": ..., <attributes>, "children": [...]}`. Leaf variants carry no
/// `children` key.
pub fn to_json_like_tree<'a>(node: impl Into<NodeRef<'a>>) -> Value {
    let node = node.into();
    let mut object = Map::new();
    object.insert("type".to_string(), Value::from(node.kind()));
    object.extend(node.attributes());
    if node.is_container() {
        let children = node.children().into_iter().map(to_json_like_tree).collect();
        object.insert("children".to_string(), Value::Array(children));
    }
    Value::Object(object)
}
