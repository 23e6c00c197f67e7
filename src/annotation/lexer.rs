use crate::diagnostics::Diagnostics;
use log::debug;

/// Prefix every directive starts with, directly followed by the directive name.
pub const NAMESPACE: &str = "openapi:";
/// Separates the structured value of a directive from its free-text description.
pub const DELIMITER: &str = "---";

const BLOCK_START: &str = "start";
const BLOCK_END: &str = "end";

/// One `openapi:<name> <argument>` line (or block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub argument: String,
}

impl Directive {
    /// Name used for matching: lower case with `-` and `_` removed.
    pub fn key(&self) -> String {
        normalize(&self.name)
    }
}

/// The directives and plain text found in one comment group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBlock {
    pub directives: Vec<Directive>,
    /// First contiguous run of non-directive lines
    pub plain_text: Option<String>,
}

impl CommentBlock {
    pub fn has_directives(&self) -> bool {
        !self.directives.is_empty()
    }
}

/// Collects the text of `#[doc = "..."]` attributes (`///`, `//!`, `/** */`), one entry per line.
pub fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(meta) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(text),
                ..
            }) = &meta.value
            {
                // A bare `///` is an empty string and still separates paragraphs
                let value = text.value();
                lines.extend(value.split('\n').map(|line| line.trim_end_matches('\r').to_string()));
            }
        }
    }
    lines
}

/// Whether any line carries the annotation namespace.
pub fn has_directive(lines: &[String]) -> bool {
    lines
        .iter()
        .any(|line| parse_directive(strip_comment_markers(line)).is_some())
}

/// Splits a comment group into directives.
///
/// A directive whose argument ends with `start` buffers every following line up to the next
/// namespace line. The closing line is consumed when it is the matching `end`, otherwise it
/// is read as a directive of its own. A block that is never closed is dropped with a warning.
pub fn lex(lines: &[String], subject: &str, diagnostics: &mut Diagnostics) -> CommentBlock {
    let mut block = CommentBlock::default();
    let mut plain: Vec<&str> = Vec::new();
    let mut plain_closed = false;
    let mut index = 0;

    while index < lines.len() {
        let line = strip_comment_markers(&lines[index]);

        let Some((name, argument)) = parse_directive(line) else {
            if line.is_empty() {
                plain_closed |= !plain.is_empty();
            } else if !plain_closed {
                plain.push(line);
            }
            index += 1;
            continue;
        };
        plain_closed |= !plain.is_empty();

        let Some(prefix) = block_prefix(&argument) else {
            block.directives.push(Directive { name, argument });
            index += 1;
            continue;
        };

        let mut body = Vec::new();
        let mut cursor = index + 1;
        let mut closing = None;
        while cursor < lines.len() {
            let inner = strip_comment_markers(&lines[cursor]);
            if let Some(directive) = parse_directive(inner) {
                closing = Some(directive);
                break;
            }
            body.push(inner);
            cursor += 1;
        }

        let Some((close_name, close_argument)) = closing else {
            diagnostics.warn(
                subject,
                format!("unterminated `{}{} {}` block dropped", NAMESPACE, name, argument),
            );
            break;
        };

        let payload = trim_blank_edges(&body).join("\n");
        let argument = if prefix.is_empty() {
            payload
        } else {
            format!("{} {}", prefix, payload)
        };

        let terminates = normalize(&close_name) == normalize(&name)
            && close_argument.split_whitespace().last() == Some(BLOCK_END);
        index = if terminates { cursor + 1 } else { cursor };

        debug!("{}: block directive `{}` spans {} lines", subject, name, body.len());
        block.directives.push(Directive { name, argument });
    }

    if !plain.is_empty() {
        block.plain_text = Some(plain.join("\n"));
    }
    block
}

/// Splits `value --- description` at the first delimiter.
pub fn split_description(argument: &str) -> (&str, Option<&str>) {
    match argument.split_once(DELIMITER) {
        Some((value, description)) => {
            let description = description.trim();
            (
                value.trim(),
                (!description.is_empty()).then_some(description),
            )
        }
        None => (argument.trim(), None),
    }
}

/// Comma separated list (enum values, tags).
pub fn comma_list(argument: &str) -> impl Iterator<Item = String> + '_ {
    argument
        .split(',')
        .map(|item| unquote(item.trim()).to_string())
        .filter(|item| !item.is_empty())
}

/// Space separated list (one-of members, media types).
pub fn space_list(argument: &str) -> impl Iterator<Item = String> + '_ {
    argument.split_whitespace().map(str::to_string)
}

pub fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

/// Reads an optional boolean argument; a bare directive means `true`.
pub fn parse_flag(argument: &str) -> Option<bool> {
    match argument.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn strip_comment_markers(line: &str) -> &str {
    line.trim()
        .trim_start_matches('/')
        .trim_start_matches('!')
        .trim_start_matches('*')
        .trim()
}

fn parse_directive(line: &str) -> Option<(String, String)> {
    let line = line.strip_prefix('@').unwrap_or(line);
    let rest = line.strip_prefix(NAMESPACE)?;
    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), argument.to_string()))
}

fn block_prefix(argument: &str) -> Option<String> {
    let tokens: Vec<&str> = argument.split_whitespace().collect();
    match tokens.split_last() {
        Some((&BLOCK_START, rest)) => Some(rest.join(" ")),
        _ => None,
    }
}

fn trim_blank_edges<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    &lines[start..end]
}
