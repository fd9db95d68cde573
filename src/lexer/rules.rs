use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n, take_while1};
use nom::character::complete::{char, not_line_ending, one_of};
use nom::combinator::{map, map_res, opt, recognize, verify};
use nom::sequence::{pair, terminated};
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that form a token of their own when nothing else claims them.
pub const SPECIAL_CHARS: &str = "_*[]()~`>#+-=|{}.!";

static AUTOLINK_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>]*$").expect("autolink url pattern")
});

static AUTOLINK_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("autolink email pattern")
});

/// Opening or closing fence recognised at line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence<'input> {
    pub fence_char: char,
    pub length: usize,
    pub info: &'input str,
}

/// `#{1,6}` followed by a space; yields the level.
pub fn header_marker(input: &str) -> IResult<&str, u8> {
    map(
        terminated(take_while_m_n(1, 6, |c: char| c == '#'), char(' ')),
        |hashes: &str| hashes.len() as u8,
    )(input)
}

fn fence_run(input: &str) -> IResult<&str, &str> {
    verify(
        alt((
            take_while1(|c: char| c == '`'),
            take_while1(|c: char| c == '~'),
        )),
        |run: &str| run.len() >= 3,
    )(input)
}

/// Three or more backticks or tildes, capturing the rest of the line.
pub fn code_fence(input: &str) -> IResult<&str, Fence<'_>> {
    map(pair(fence_run, not_line_ending), |(run, info): (&str, &str)| {
        Fence {
            fence_char: if run.starts_with('~') { '~' } else { '`' },
            length: run.len(),
            info,
        }
    })(input)
}

/// `>` plus at most one following space.
pub fn blockquote_marker(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('>'), opt(char(' '))))(input)
}

/// A whole line of three or more identical `-`, `*` or `_`, spaces allowed.
pub fn horizontal_rule(input: &str) -> IResult<&str, &str> {
    verify(not_line_ending, is_rule_line)(input)
}

fn is_rule_line(line: &str) -> bool {
    let mut marker = None;
    let mut count = 0;
    for ch in line.chars() {
        match ch {
            ' ' | '\t' => {}
            '-' | '*' | '_' => {
                if marker.is_some_and(|m| m != ch) {
                    return false;
                }
                marker = Some(ch);
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

/// `-`, `*` or `+` followed by a required space.
pub fn bullet_marker(input: &str) -> IResult<&str, char> {
    terminated(one_of("-*+"), char(' '))(input)
}

/// Up to nine digits, a dot and a required space.
pub fn ordered_marker(input: &str) -> IResult<&str, u64> {
    map_res(
        terminated(
            take_while_m_n(1, 9, |c: char| c.is_ascii_digit()),
            tag(". "),
        ),
        |digits: &str| digits.parse::<u64>(),
    )(input)
}

/// Recognises a line that opens a fence, as opposed to a malformed one-line
/// fence whose info string embeds another fence run.
pub fn fence_opening(line: &str) -> Option<(char, usize)> {
    let (_, fence) = code_fence(line).ok()?;
    if find_fence_run(fence.info, fence.fence_char, 3).is_some() {
        return None;
    }
    Some((fence.fence_char, fence.length))
}

/// True when `line` closes a fence opened with `fence_char` x `length`.
pub fn is_fence_close(line: &str, fence_char: char, length: usize) -> bool {
    match code_fence(line) {
        Ok((_, fence)) => {
            fence.fence_char == fence_char && fence.length >= length && fence.info.trim().is_empty()
        }
        Err(_) => false,
    }
}

/// Byte offset and length of the first run of at least `min` `fence_char`s.
pub fn find_fence_run(text: &str, fence_char: char, min: usize) -> Option<(usize, usize)> {
    let mut start = None;
    let mut length = 0;
    for (idx, ch) in text.char_indices() {
        if ch == fence_char {
            if start.is_none() {
                start = Some(idx);
            }
            length += 1;
        } else {
            if let Some(begin) = start
                && length >= min
            {
                return Some((begin, length));
            }
            start = None;
            length = 0;
        }
    }
    match start {
        Some(begin) if length >= min => Some((begin, length)),
        _ => None,
    }
}

pub fn is_autolink_url(candidate: &str) -> bool {
    AUTOLINK_URL.is_match(candidate)
}

pub fn is_autolink_email(candidate: &str) -> bool {
    AUTOLINK_EMAIL.is_match(candidate)
}
