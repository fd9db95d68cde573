use std::collections::HashMap;

use crate::ast::{EmphasisKind, Inline};
use crate::lexer::rules;

use super::references::ReferenceMap;

/// Parses the flattened text of one paragraph, header or link label into
/// inline nodes.
///
/// Precedence at each position, first match wins: code span, autolink,
/// image, link, emphasis, escape, plain text.
pub struct InlineParser<'r> {
    references: &'r ReferenceMap,
}

impl<'r> InlineParser<'r> {
    pub fn new(references: &'r ReferenceMap) -> Self {
        Self { references }
    }

    pub fn parse(&self, text: &str) -> Vec<Inline> {
        let chars: Vec<char> = text.chars().collect();
        self.parse_chars(&chars, true)
    }

    fn parse_chars(&self, chars: &[char], allow_links: bool) -> Vec<Inline> {
        let mut output = Vec::new();
        let mut buffer = String::new();
        let mut idx = 0usize;
        let mut index = SpanIndex::new(chars);

        while idx < chars.len() {
            let ch = chars[idx];
            let parsed = match ch {
                '`' => code_span(chars, idx, &index),
                '<' => autolink(chars, idx),
                '!' if allow_links && chars.get(idx + 1) == Some(&'[') => {
                    self.image(chars, idx, &index)
                }
                '[' if allow_links => self.link(chars, idx, &index),
                '*' | '_' | '~' => self.emphasis(chars, idx, allow_links, &mut index),
                '\\' if idx + 1 < chars.len() => {
                    buffer.push(chars[idx + 1]);
                    idx += 2;
                    continue;
                }
                _ => None,
            };

            match parsed {
                Some((node, next)) => {
                    flush_text(&mut buffer, &mut output);
                    output.push(node);
                    idx = next;
                }
                None => {
                    // Unmatched delimiter runs stay literal as a whole.
                    let len = match ch {
                        '`' | '*' | '_' | '~' => run_length(chars, idx, ch),
                        _ => 1,
                    };
                    buffer.extend(&chars[idx..idx + len]);
                    idx += len;
                }
            }
        }

        flush_text(&mut buffer, &mut output);
        merge_text(output)
    }

    fn image(&self, chars: &[char], idx: usize, index: &SpanIndex) -> Option<(Inline, usize)> {
        let (label_end, target, next) = self.bracket_target(chars, idx + 1, index)?;
        let alt = Inline::plain_text(&self.parse_chars(&chars[idx + 2..label_end], false));
        let (url, title, _) = target;
        Some((
            Inline::Image {
                url,
                alt_text: alt,
                title,
            },
            next,
        ))
    }

    fn link(&self, chars: &[char], idx: usize, index: &SpanIndex) -> Option<(Inline, usize)> {
        let (label_end, target, next) = self.bracket_target(chars, idx, index)?;
        let (url, title, is_reference) = target;
        Some((
            Inline::Link {
                url,
                title,
                is_reference,
                content: self.parse_chars(&chars[idx + 1..label_end], false),
            },
            next,
        ))
    }

    /// Resolves the target of `[label]` starting at `open`: an inline
    /// destination, then a full or collapsed reference, then a shortcut
    /// reference. Returns the index of `]`, the target and the next index.
    #[allow(clippy::type_complexity)]
    fn bracket_target(
        &self,
        chars: &[char],
        open: usize,
        index: &SpanIndex,
    ) -> Option<(usize, (String, Option<String>, bool), usize)> {
        let close = index.matching_bracket(chars, open)?;

        if chars.get(close + 1) == Some(&'(')
            && let Some((url, title, next)) = inline_destination(chars, close + 1)
        {
            return Some((close, (url, title, false), next));
        }

        let label_text: String = chars[open + 1..close].iter().collect();

        if chars.get(close + 1) == Some(&'[')
            && let Some(label_close) = find_char(chars, close + 2, ']')
        {
            let label: String = chars[close + 2..label_close].iter().collect();
            let label = if label.trim().is_empty() {
                label_text.clone()
            } else {
                label
            };
            return self
                .references
                .get(&label)
                .map(|r| (close, (r.url.clone(), r.title.clone(), true), label_close + 1));
        }

        self.references
            .get(&label_text)
            .map(|r| (close, (r.url.clone(), r.title.clone(), true), close + 1))
    }

    fn emphasis(
        &self,
        chars: &[char],
        idx: usize,
        allow_links: bool,
        index: &mut SpanIndex,
    ) -> Option<(Inline, usize)> {
        let marker = chars[idx];
        let run = run_length(chars, idx, marker);
        let kind = EmphasisKind::from_run(marker, run)?;

        if marker == '_' && !is_boundary(idx.checked_sub(1).map(|i| chars[i])) {
            return None;
        }
        // Left-flanking: the opener must touch non-whitespace.
        if chars.get(idx + run).is_none_or(|c| c.is_whitespace()) {
            return None;
        }

        let close = index.closer(chars, idx + run, marker, run)?;
        let inner = &chars[idx + run..close];
        if inner.iter().all(|c| c.is_whitespace()) {
            return None;
        }

        Some((
            Inline::Emphasis {
                kind,
                content: self.parse_chars(inner, allow_links),
            },
            close + run,
        ))
    }
}

/// Delimiter lookups built once per text slice, so an unmatched opener costs
/// a table lookup instead of a scan to the end of the text.
struct SpanIndex {
    /// End of the code span opened by each maximal backtick run.
    code_spans: HashMap<usize, usize>,
    /// Matching `]` for every `[` the bracket scan reached.
    brackets: HashMap<usize, Option<usize>>,
    /// Earliest start from which a closer search for `(marker, run)` failed.
    /// A search from any later start fails too.
    missing_closers: HashMap<(char, usize), usize>,
}

impl SpanIndex {
    fn new(chars: &[char]) -> Self {
        let code_spans = index_code_spans(chars);
        let brackets = index_brackets(chars, &code_spans);
        Self {
            code_spans,
            brackets,
            missing_closers: HashMap::new(),
        }
    }

    fn code_span_end(&self, chars: &[char], start: usize) -> Option<usize> {
        span_end(&self.code_spans, chars, start)
    }

    fn matching_bracket(&self, chars: &[char], open: usize) -> Option<usize> {
        match self.brackets.get(&open) {
            Some(close) => *close,
            None => matching_bracket(chars, open),
        }
    }

    fn closer(&mut self, chars: &[char], from: usize, marker: char, run: usize) -> Option<usize> {
        let key = (marker, run);
        if self.missing_closers.get(&key).is_some_and(|&failed| from >= failed) {
            return None;
        }
        let found = find_closer(chars, from, marker, run, self);
        if found.is_none() {
            let failed = self.missing_closers.entry(key).or_insert(from);
            *failed = (*failed).min(from);
        }
        found
    }
}

/// Pairs every maximal backtick run with the next run of the same length.
fn index_code_spans(chars: &[char]) -> HashMap<usize, usize> {
    let mut runs = Vec::new();
    let mut idx = 0;
    while idx < chars.len() {
        if chars[idx] == '`' {
            let len = run_length(chars, idx, '`');
            runs.push((idx, len));
            idx += len;
        } else {
            idx += 1;
        }
    }

    let mut next_of_length: HashMap<usize, usize> = HashMap::new();
    let mut spans = HashMap::new();
    for &(start, len) in runs.iter().rev() {
        if let Some(&close) = next_of_length.get(&len) {
            spans.insert(start, close + len);
        }
        next_of_length.insert(len, start);
    }
    spans
}

/// Stack-pairs brackets with the same skipping rules as `matching_bracket`.
fn index_brackets(
    chars: &[char],
    code_spans: &HashMap<usize, usize>,
) -> HashMap<usize, Option<usize>> {
    let mut pairs = HashMap::new();
    let mut open = Vec::new();
    let mut idx = 0;
    while idx < chars.len() {
        match chars[idx] {
            '\\' => idx += 1,
            '`' => {
                if let Some(end) = span_end(code_spans, chars, idx) {
                    idx = end;
                    continue;
                }
                idx += run_length(chars, idx, '`') - 1;
            }
            '[' => {
                pairs.insert(idx, None);
                open.push(idx);
            }
            ']' => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, Some(idx));
                }
            }
            _ => {}
        }
        idx += 1;
    }
    pairs
}

/// Indexed lookup for maximal runs; a run entered mid-way (after an escaped
/// backtick) falls back to scanning.
fn span_end(code_spans: &HashMap<usize, usize>, chars: &[char], start: usize) -> Option<usize> {
    if start == 0 || chars[start - 1] != '`' {
        code_spans.get(&start).copied()
    } else {
        code_span_end(chars, start)
    }
}

/// Parses `text` with an empty reference table.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let references = ReferenceMap::new();
    InlineParser::new(&references).parse(text)
}

fn flush_text(buffer: &mut String, output: &mut Vec<Inline>) {
    if buffer.is_empty() {
        return;
    }
    output.push(Inline::Text(std::mem::take(buffer)));
}

fn merge_text(nodes: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (merged.last_mut(), node) {
            (Some(Inline::Text(previous)), Inline::Text(text)) => previous.push_str(&text),
            (_, node) => merged.push(node),
        }
    }
    merged
}

fn run_length(chars: &[char], start: usize, marker: char) -> usize {
    chars[start..].iter().take_while(|&&c| c == marker).count()
}

fn find_char(chars: &[char], start: usize, target: char) -> Option<usize> {
    (start..chars.len()).find(|&i| chars[i] == target)
}

fn is_boundary(neighbour: Option<char>) -> bool {
    neighbour.is_none_or(|c| !c.is_alphanumeric())
}

/// End index (exclusive) of the code span opening at `start`, if closed.
fn code_span_end(chars: &[char], start: usize) -> Option<usize> {
    let open = run_length(chars, start, '`');
    let mut idx = start + open;
    while idx < chars.len() {
        if chars[idx] == '`' {
            let close = run_length(chars, idx, '`');
            if close == open {
                return Some(idx + close);
            }
            idx += close;
        } else {
            idx += 1;
        }
    }
    None
}

fn code_span(chars: &[char], start: usize, index: &SpanIndex) -> Option<(Inline, usize)> {
    let open = run_length(chars, start, '`');
    let end = index.code_span_end(chars, start)?;
    let mut content = &chars[start + open..end - open];
    if content.len() >= 2
        && content[0] == ' '
        && content[content.len() - 1] == ' '
        && content.iter().any(|&c| c != ' ')
    {
        content = &content[1..content.len() - 1];
    }
    Some((Inline::CodeSpan(content.iter().collect()), end))
}

fn autolink(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    // Whitespace and `<` cannot occur inside an autolink, so the scan stops there.
    let close = (start + 1..chars.len())
        .find(|&i| chars[i] == '>' || chars[i] == '<' || chars[i].is_whitespace())?;
    if chars[close] != '>' || close == start + 1 {
        return None;
    }
    let candidate: String = chars[start + 1..close].iter().collect();
    let is_email = if rules::is_autolink_url(&candidate) {
        false
    } else if rules::is_autolink_email(&candidate) {
        true
    } else {
        return None;
    };
    Some((
        Inline::Autolink {
            url: candidate,
            is_email,
        },
        close + 1,
    ))
}

/// Index of the `]` balancing the `[` at `open`. Escapes and code spans are
/// skipped.
fn matching_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut idx = open;
    while idx < chars.len() {
        match chars[idx] {
            '\\' => idx += 1,
            '`' => {
                if let Some(end) = code_span_end(chars, idx) {
                    idx = end;
                    continue;
                }
                idx += run_length(chars, idx, '`') - 1;
            }
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
        idx += 1;
    }
    None
}

/// Searches for a closing run of exactly `run` markers.
fn find_closer(
    chars: &[char],
    from: usize,
    marker: char,
    run: usize,
    index: &SpanIndex,
) -> Option<usize> {
    let mut idx = from;
    while idx < chars.len() {
        match chars[idx] {
            '\\' => idx += 2,
            '`' => {
                idx = index
                    .code_span_end(chars, idx)
                    .unwrap_or(idx + run_length(chars, idx, '`'));
            }
            c if c == marker => {
                let len = run_length(chars, idx, marker);
                let right_flanking = idx > from && !chars[idx - 1].is_whitespace();
                let boundary_ok = marker != '_' || is_boundary(chars.get(idx + len).copied());
                if len == run && right_flanking && boundary_ok {
                    return Some(idx);
                }
                idx += len;
            }
            _ => idx += 1,
        }
    }
    None
}

fn skip_whitespace(chars: &[char], mut idx: usize) -> usize {
    while idx < chars.len() && matches!(chars[idx], ' ' | '\t' | '\n') {
        idx += 1;
    }
    idx
}

/// Parses `(destination "title")` with `open` at the `(`. The destination
/// must be non-empty; `<...>` destinations may contain spaces.
fn inline_destination(chars: &[char], open: usize) -> Option<(String, Option<String>, usize)> {
    let mut idx = skip_whitespace(chars, open + 1);

    let url = if chars.get(idx) == Some(&'<') {
        let close =
            (idx + 1..chars.len()).find(|&i| matches!(chars[i], '>' | '<' | '\n'))?;
        if chars[close] != '>' {
            return None;
        }
        let url: String = chars[idx + 1..close].iter().collect();
        idx = close + 1;
        url
    } else {
        let start = idx;
        let mut depth = 0usize;
        while idx < chars.len() {
            match chars[idx] {
                '\\' if idx + 1 < chars.len() => idx += 1,
                '(' => depth += 1,
                ')' if depth == 0 => break,
                ')' => depth -= 1,
                c if c.is_whitespace() || c.is_control() => break,
                _ => {}
            }
            idx += 1;
        }
        if idx == start {
            return None;
        }
        chars[start..idx].iter().collect()
    };
    if url.is_empty() {
        return None;
    }

    let after_url = idx;
    idx = skip_whitespace(chars, idx);
    let mut title = None;
    if idx > after_url
        && let Some((parsed, next)) = link_title(chars, idx)
    {
        title = Some(parsed);
        idx = skip_whitespace(chars, next);
    }

    if chars.get(idx) != Some(&')') {
        return None;
    }
    Some((unescape(&url), title, idx + 1))
}

/// `"title"`, `'title'` or `(title)`, with backslash escapes resolved.
fn link_title(chars: &[char], start: usize) -> Option<(String, usize)> {
    let closing = match chars.get(start)? {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };
    let mut title = String::new();
    let mut idx = start + 1;
    while idx < chars.len() {
        match chars[idx] {
            '\\' if idx + 1 < chars.len() => {
                title.push(chars[idx + 1]);
                idx += 2;
                continue;
            }
            c if c == closing => return Some((title, idx + 1)),
            c => title.push(c),
        }
        idx += 1;
    }
    None
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::references::LinkReference;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Inline {
        Inline::text(s)
    }

    fn emphasis(kind: EmphasisKind, content: Vec<Inline>) -> Inline {
        Inline::Emphasis { kind, content }
    }

    #[test]
    fn plain_text_is_single_node() {
        assert_eq!(parse_inline("just words here"), vec![text("just words here")]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn emphasis_kinds() {
        assert_eq!(
            parse_inline("*a* **b** ***c*** ~~d~~"),
            vec![
                emphasis(EmphasisKind::Italic, vec![text("a")]),
                text(" "),
                emphasis(EmphasisKind::Bold, vec![text("b")]),
                text(" "),
                emphasis(EmphasisKind::BoldItalic, vec![text("c")]),
                text(" "),
                emphasis(EmphasisKind::Strikethrough, vec![text("d")]),
            ]
        );
    }

    #[test]
    fn nested_emphasis() {
        // Closers must match the opener length exactly.
        assert_eq!(parse_inline("**bold *it***x"), vec![text("**bold *it***x")]);
        assert_eq!(
            parse_inline("**bold *it* end**"),
            vec![emphasis(
                EmphasisKind::Bold,
                vec![
                    text("bold "),
                    emphasis(EmphasisKind::Italic, vec![text("it")]),
                    text(" end"),
                ]
            )]
        );
    }

    #[test]
    fn unmatched_and_spaced_delimiters_stay_literal() {
        assert_eq!(parse_inline("2 * 3 * 4"), vec![text("2 * 3 * 4")]);
        assert_eq!(parse_inline("**open"), vec![text("**open")]);
        assert_eq!(parse_inline("~single~"), vec![text("~single~")]);
        assert_eq!(parse_inline("****"), vec![text("****")]);
    }

    #[test]
    fn underscore_word_boundary() {
        assert_eq!(parse_inline("snake_case_name"), vec![text("snake_case_name")]);
        assert_eq!(
            parse_inline("_it_"),
            vec![emphasis(EmphasisKind::Italic, vec![text("it")])]
        );
        assert_eq!(parse_inline("_it_s"), vec![text("_it_s")]);
    }

    #[test]
    fn code_span_beats_emphasis() {
        assert_eq!(
            parse_inline("`**not bold**`"),
            vec![Inline::CodeSpan("**not bold**".into())]
        );
        assert_eq!(
            parse_inline("*a `*` b*"),
            vec![emphasis(
                EmphasisKind::Italic,
                vec![text("a "), Inline::CodeSpan("*".into()), text(" b")]
            )]
        );
    }

    #[test]
    fn code_span_trims_one_space_each_side() {
        assert_eq!(parse_inline("`` `x` ``"), vec![Inline::CodeSpan("`x`".into())]);
        assert_eq!(parse_inline("`  `"), vec![Inline::CodeSpan("  ".into())]);
        assert_eq!(parse_inline("``a`"), vec![text("``a`")]);
    }

    #[test]
    fn autolinks() {
        assert_eq!(
            parse_inline("<https://a.io> <me@x.org>"),
            vec![
                Inline::Autolink {
                    url: "https://a.io".into(),
                    is_email: false
                },
                text(" "),
                Inline::Autolink {
                    url: "me@x.org".into(),
                    is_email: true
                },
            ]
        );
        assert_eq!(parse_inline("a < b > c"), vec![text("a < b > c")]);
    }

    #[test]
    fn inline_link_with_title() {
        assert_eq!(
            parse_inline("[the *docs*](https://d.rs \"Title \\\"q\\\"\")"),
            vec![Inline::Link {
                url: "https://d.rs".into(),
                title: Some("Title \"q\"".into()),
                is_reference: false,
                content: vec![text("the "), emphasis(EmphasisKind::Italic, vec![text("docs")])],
            }]
        );
    }

    #[test]
    fn link_text_cannot_contain_links() {
        let nodes = parse_inline("[a [b](c) d](e)");
        assert_eq!(
            nodes,
            vec![Inline::Link {
                url: "e".into(),
                title: None,
                is_reference: false,
                content: vec![text("a [b](c) d")],
            }]
        );
    }

    #[test]
    fn empty_destination_is_literal() {
        assert_eq!(parse_inline("[a]()"), vec![text("[a]()")]);
    }

    #[test]
    fn images() {
        assert_eq!(
            parse_inline("![an *alt*](/i.png 'T')"),
            vec![Inline::Image {
                url: "/i.png".into(),
                alt_text: "an alt".into(),
                title: Some("T".into()),
            }]
        );
    }

    #[test]
    fn reference_links() {
        let mut refs = ReferenceMap::new();
        refs.insert(
            "Docs",
            LinkReference {
                url: "https://docs.rs".into(),
                title: None,
            },
        );
        let parser = InlineParser::new(&refs);
        let expected = Inline::Link {
            url: "https://docs.rs".into(),
            title: None,
            is_reference: true,
            content: vec![text("docs")],
        };
        assert_eq!(parser.parse("[docs][]"), vec![expected.clone()]);
        assert_eq!(parser.parse("[docs]"), vec![expected]);
        assert_eq!(
            parser.parse("[here][DOCS]"),
            vec![Inline::Link {
                url: "https://docs.rs".into(),
                title: None,
                is_reference: true,
                content: vec![text("here")],
            }]
        );
        assert_eq!(parser.parse("[missing]"), vec![text("[missing]")]);
        assert_eq!(parser.parse("[x][missing]"), vec![text("[x][missing]")]);
    }

    #[test]
    fn escapes_produce_literals() {
        assert_eq!(parse_inline("\\*not\\* \\[x\\]"), vec![text("*not* [x]")]);
        assert_eq!(parse_inline("trailing \\"), vec![text("trailing \\")]);
    }

    #[test]
    fn escaped_backtick_opens_a_shorter_span() {
        assert_eq!(
            parse_inline("\\``a`"),
            vec![text("`"), Inline::CodeSpan("a".into())]
        );
        assert_eq!(
            parse_inline("`a` ``b`` `c"),
            vec![
                Inline::CodeSpan("a".into()),
                text(" "),
                Inline::CodeSpan("b".into()),
                text(" `c"),
            ]
        );
    }

    #[test]
    fn long_unmatched_runs_stay_literal() {
        let started = std::time::Instant::now();
        for unit in ["*a ", "**a ", "_a ", "~~a ", "[a ", "<a ", "[a](<b "] {
            let input = unit.repeat(20_000);
            assert_eq!(parse_inline(&input), vec![text(&input)], "{unit:?}");
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn unicode_passes_through() {
        assert_eq!(
            parse_inline("héllo 🌍 שלום\u{200b} *ü*"),
            vec![
                text("héllo 🌍 שלום\u{200b} "),
                emphasis(EmphasisKind::Italic, vec![text("ü")]),
            ]
        );
    }
}
