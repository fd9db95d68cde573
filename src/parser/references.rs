use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer::rules;

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^ {0,3}\[([^\]]+)\]:[ \t]*(<[^>\n]*>|\S+)(?:[ \t]+("[^"\n]*"|'[^'\n]*'|\([^)\n]*\)))?[ \t]*$"#,
    )
    .expect("reference definition pattern")
});

/// Link reference definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub url: String,
    pub title: Option<String>,
}

/// Map of link reference definitions, keyed by normalized label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    references: HashMap<String, LinkReference>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a definition unless the label is already defined.
    pub fn insert(&mut self, label: &str, reference: LinkReference) -> bool {
        let key = normalize_label(label);
        if key.is_empty() || self.references.contains_key(&key) {
            return false;
        }
        self.references.insert(key, reference);
        true
    }

    pub fn get(&self, label: &str) -> Option<&LinkReference> {
        self.references.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Lowercases, trims and collapses internal whitespace.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Pulls `[label]: url "title"` lines out of `text`.
///
/// Definition lines are replaced by empty lines so that line numbers of the
/// remaining content do not shift. Lines inside fenced code are left alone.
pub fn extract_references(text: &str) -> (String, ReferenceMap) {
    let mut references = ReferenceMap::new();
    let mut lines = Vec::new();
    let mut open_fence: Option<(char, usize)> = None;

    for line in text.split('\n') {
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some((fence_char, length)) = open_fence {
            if rules::is_fence_close(trimmed, fence_char, length) {
                open_fence = None;
            }
            lines.push(line);
            continue;
        }
        if let Some(fence) = rules::fence_opening(trimmed) {
            open_fence = Some(fence);
            lines.push(line);
            continue;
        }
        match parse_definition(line) {
            Some((label, reference)) => {
                references.insert(&label, reference);
                lines.push("");
            }
            None => lines.push(line),
        }
    }

    (lines.join("\n"), references)
}

fn parse_definition(line: &str) -> Option<(String, LinkReference)> {
    let captures = DEFINITION.captures(line)?;
    let label = captures.get(1)?.as_str().to_string();
    let url = captures.get(2)?.as_str();
    let url = url
        .strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or(url)
        .to_string();
    let title = captures.get(3).map(|m| {
        let quoted = m.as_str();
        quoted[1..quoted.len() - 1].to_string()
    });
    Some((label, LinkReference { url, title }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_and_blanks_definitions() {
        let input = "See [docs].\n\n[Docs]: https://docs.rs \"Rust docs\"\n[x]: <a b>";
        let (text, refs) = extract_references(input);
        assert_eq!(text, "See [docs].\n\n\n");
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs.get("DOCS"),
            Some(&LinkReference {
                url: "https://docs.rs".to_string(),
                title: Some("Rust docs".to_string()),
            })
        );
        assert_eq!(refs.get("x").map(|r| r.url.as_str()), Some("a b"));
    }

    #[test]
    fn first_definition_wins() {
        let (_, refs) = extract_references("[a]: /first\n[A]: /second");
        assert_eq!(refs.get("a").map(|r| r.url.as_str()), Some("/first"));
    }

    #[test]
    fn ignores_definitions_inside_fences() {
        let input = "```\n[a]: /inside\n```\n";
        let (text, refs) = extract_references(input);
        assert!(refs.is_empty());
        assert_eq!(text, input);
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label("  Foo \t Bar "), "foo bar");
    }
}
