//! End-to-end behaviour of parse and render across all three formats.

use markdown_dialect::{
    Block, ListStyle, MarkdownEngine, OutputFormat, parse, render, to_html, to_json_like_tree,
    to_markdown, to_markdown_v2,
};
use pretty_assertions::assert_eq;

const IDEMPOTENCE_SAMPLES: &[&str] = &[
    "# Title\n\nSome *italic* and **bold** text.",
    "1. A\n2. B\n3. C\n   - C.1\n   - C.2",
    "> quote\n> more\n\n---\n\n```rust\nfn main() {}\n```",
    "Special chars: _*[]()~`>#+-=|{}.!",
    "[link](https://example.com \"Title\") and ![img](/a.png)",
    "- a\n\n- b\n\n  continued",
    "`code` with ``double `tick` ``",
    "Text with \\# escape\n# real header #",
    "~~gone~~ and ***both*** <https://example.com>",
    "[ref link][r]\n\n[r]: /target \"T\"",
    "```\nunterminated\n# stops here",
    "_a **b**_",
    "**a _b_**",
    "*a _b_ c*",
    "- a\n   - b",
    "- ```js\n  code\n# Heading\n\nParagraph after",
];

#[test]
fn normalized_markdown_is_a_fixed_point() {
    for input in IDEMPOTENCE_SAMPLES {
        let once = to_markdown(input);
        let twice = to_markdown(&once);
        assert_eq!(twice, once, "normalizing {input:?} is not stable");
    }
}

#[test]
fn markdown_v2_escapes_every_special_character() {
    let output = to_markdown_v2("Special chars: _*[]()~`>#+-=|{}.!");
    for c in "_*[]()~`>#+-=|{}.!".chars() {
        assert!(
            output.contains(&format!("\\{c}")),
            "{c:?} is not escaped in {output:?}"
        );
    }
}

#[test]
fn code_spans_bind_tighter_than_emphasis() {
    let html = to_html("`**not bold**`");
    assert!(html.contains("<code>**not bold**</code>"));
    assert!(!html.contains("<strong>"));
}

#[test]
fn list_markers_inside_fences_stay_literal() {
    let input = "```\n* item\n1. item\n```";

    let html = to_html(input);
    for tag in ["<ul>", "<ol>", "<li>"] {
        assert!(!html.contains(tag), "{tag} found in {html:?}");
    }
    assert!(html.contains("* item\n1. item"));

    let v2 = to_markdown_v2(input);
    assert!(!v2.contains('•'));
    assert_eq!(v2, "```\n* item\n1. item\n```");
}

#[test]
fn emphasis_renders_to_html_tags() {
    assert_eq!(to_html("*italic*"), "<p><em>italic</em></p>\n");
    assert_eq!(to_html("**bold**"), "<p><strong>bold</strong></p>\n");
    assert_eq!(to_html("***both***"), "<p><strong><em>both</em></strong></p>\n");
    assert_eq!(to_html("~~strike~~"), "<p><del>strike</del></p>\n");
}

#[test]
fn markdown_v2_headers_become_escaped_hashes() {
    let output = to_markdown_v2("# Header 1");
    assert!(output.contains("\\# Header 1"));
    assert!(!output.starts_with("# "));
}

#[test]
fn nested_list_structure() {
    let document = parse("1. A\n2. B\n3. C\n   - C.1\n   - C.2").unwrap();
    assert_eq!(document.blocks.len(), 1);

    let Block::List {
        style: ListStyle::Ordered,
        items,
        ..
    } = &document.blocks[0]
    else {
        panic!("expected an ordered list, got {:?}", document.blocks[0]);
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].children.len(), 1);
    assert_eq!(items[1].children.len(), 1);

    let nested: Vec<&Block> = items[2]
        .children
        .iter()
        .filter(|block| matches!(block, Block::List { .. }))
        .collect();
    assert_eq!(nested.len(), 1);
    let Block::List {
        style: ListStyle::Unordered,
        items: nested_items,
        ..
    } = nested[0]
    else {
        panic!("expected an unordered nested list");
    };
    assert_eq!(nested_items.len(), 2);
}

#[test]
fn json_like_tree_mirrors_the_ast() {
    let document = parse("1. A\n2. B\n3. C\n   - C.1\n   - C.2").unwrap();
    let tree = to_json_like_tree(&document);

    assert_eq!(tree["type"], "document");
    let list = &tree["children"][0];
    assert_eq!(list["type"], "list");
    assert_eq!(list["ordered"], true);
    assert_eq!(list["children"].as_array().map(Vec::len), Some(3));

    let third = &list["children"][2];
    assert_eq!(third["type"], "list_item");
    assert_eq!(third["children"][1]["type"], "list");
    assert_eq!(third["children"][1]["ordered"], false);
    assert_eq!(
        third["children"][1]["children"][1]["children"][0]["children"][0]["content"],
        "C.2"
    );
}

#[test]
fn unicode_passes_through_html() {
    let input =
        "Emoji 🎉👩‍👩‍👧 and مرحبا بالعالم with zero\u{200B}width joiners";
    let html = to_html(input);
    assert_eq!(html, format!("<p>{input}</p>\n"));
}

#[test]
fn renderers_never_fail_on_parsed_documents() {
    let engine = MarkdownEngine::new();
    for input in IDEMPOTENCE_SAMPLES {
        let document = engine.parse(input).unwrap();
        for format in [
            OutputFormat::Html,
            OutputFormat::Markdown,
            OutputFormat::MarkdownV2,
        ] {
            assert!(render(&document, format).is_ok(), "{format} failed on {input:?}");
        }
    }
}
