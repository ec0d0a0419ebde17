//! Source-text preprocessing that runs before the markdown parser sees the
//! document.
//!
//! Order is fixed and load-bearing: frontmatter is stripped first (so a `%%`
//! inside frontmatter never opens a comment), comments second, and math
//! extraction last, behind code-span protection, so `$` characters inside
//! fenced blocks or inline code are never mistaken for math delimiters.

use std::borrow::Cow;

use crate::render::session::{RenderSession, SENTINEL};

/// Clean the raw document for parsing, lifting math expressions into
/// session-held placeholders.
pub(crate) fn preprocess(raw: &str, session: &mut RenderSession<'_>) -> String {
    let scrubbed: Cow<'_, str> = if raw.contains(SENTINEL) {
        Cow::Owned(raw.replace(SENTINEL, ""))
    } else {
        Cow::Borrowed(raw)
    };
    let (_, body) = split_frontmatter(&scrubbed);
    let body = strip_comments(body);

    let mut code_chunks = Vec::new();
    let shielded = shield_fenced_blocks(&body, &mut code_chunks);
    let shielded = shield_inline_code(&shielded, &mut code_chunks);
    let extracted = extract_display_math(&shielded, session);
    let extracted = extract_inline_math(&extracted, session);
    restore_code(extracted, &code_chunks)
}

/// Split a leading YAML frontmatter block off the document.
///
/// The block must start at the very first byte and be terminated by a `---`
/// line; an unterminated opener is ordinary content.
pub(crate) fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let after_open = if let Some(rest) = raw.strip_prefix("---\n") {
        rest
    } else if let Some(rest) = raw.strip_prefix("---\r\n") {
        rest
    } else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let block = &after_open[..offset];
            let rest = &after_open[offset + line.len()..];
            return (Some(block), rest);
        }
        offset += line.len();
    }
    (None, raw)
}

/// Strip `%%...%%` comment spans, multi-line included. An unclosed `%%`
/// comments out the rest of the document, matching the editor's behavior.
pub(crate) fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("%%") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("%%") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn code_sentinel(index: usize) -> String {
    format!("{SENTINEL}c{index}{SENTINEL}")
}

/// Replace fenced code blocks with single-use sentinels, storing the block
/// text (fences included) verbatim.
fn shield_fenced_blocks(input: &str, chunks: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open_fence: Option<(char, usize)> = None;
    let mut block = String::new();

    for line in input.split_inclusive('\n') {
        match open_fence {
            None => {
                if let Some(fence) = fence_open(line) {
                    open_fence = Some(fence);
                    block.clear();
                    block.push_str(line);
                } else {
                    out.push_str(line);
                }
            }
            Some((marker, len)) => {
                block.push_str(line);
                if fence_close(line, marker, len) {
                    out.push_str(&code_sentinel(chunks.len()));
                    chunks.push(std::mem::take(&mut block));
                    open_fence = None;
                }
            }
        }
    }
    if open_fence.is_some() {
        // Unterminated fence: the tail is code as far as `$` scanning cares.
        out.push_str(&code_sentinel(chunks.len()));
        chunks.push(block);
    }
    out
}

fn fence_open(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    for marker in ['`', '~'] {
        let run = trimmed.chars().take_while(|&c| c == marker).count();
        if run >= 3 {
            return Some((marker, run));
        }
    }
    None
}

fn fence_close(line: &str, marker: char, len: usize) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.len() >= len && trimmed.chars().all(|c| c == marker)
}

/// Replace inline code spans (matching backtick run lengths, CommonMark
/// style) with sentinels.
fn shield_inline_code(input: &str, chunks: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('`') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let open_len = after.chars().take_while(|&c| c == '`').count();
        // A code span never crosses a blank line; bound the search to the
        // current paragraph.
        let limit = after.find("\n\n").unwrap_or(after.len());
        match find_closing_run(&after[open_len..limit], open_len) {
            Some(close_end) => {
                let span_end = open_len + close_end;
                out.push_str(&code_sentinel(chunks.len()));
                chunks.push(after[..span_end].to_string());
                rest = &after[span_end..];
            }
            None => {
                out.push_str(&after[..open_len]);
                rest = &after[open_len..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Find a backtick run of exactly `len` in `body`; returns the byte offset
/// one past the end of that run.
fn find_closing_run(body: &str, len: usize) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run_start = i;
            while i < bytes.len() && bytes[i] == b'`' {
                i += 1;
            }
            if i - run_start == len {
                return Some(i);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn restore_code(text: String, chunks: &[String]) -> String {
    let mut text = text;
    for (index, chunk) in chunks.iter().enumerate() {
        text = text.replace(&code_sentinel(index), chunk);
    }
    text
}

/// Extract `$$...$$` display math (may span lines). Empty spans stay literal;
/// an unterminated opener stays literal.
fn extract_display_math(input: &str, session: &mut RenderSession<'_>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("$$") {
        if rest[..start].ends_with('\\') {
            out.push_str(&rest[..start + 1]);
            rest = &rest[start + 1..];
            continue;
        }
        match rest[start + 2..].find("$$") {
            Some(end) => {
                let expression = &rest[start + 2..start + 2 + end];
                if expression.trim().is_empty() {
                    out.push_str(&rest[..start + 2]);
                    rest = &rest[start + 2..];
                } else {
                    out.push_str(&rest[..start]);
                    let id = session.register_math(expression.to_string(), true);
                    out.push_str(&id);
                    rest = &rest[start + 2 + end + 2..];
                }
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Extract single-line `$...$` inline math.
///
/// A span must be non-empty, must not start or end with whitespace, and the
/// opening `$` must be neither backslash-escaped nor immediately followed by
/// a digit. The digit rule is a heuristic that keeps currency-like text
/// ("$5 and $6") out of math; it also rejects genuine math that starts with
/// a digit, which is the documented trade-off.
fn extract_inline_math(input: &str, session: &mut RenderSession<'_>) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.split_inclusive('\n') {
        scan_line_for_math(line, &mut out, session);
    }
    out
}

fn scan_line_for_math(line: &str, out: &mut String, session: &mut RenderSession<'_>) {
    let mut rest = line;
    while let Some(open) = rest.find('$') {
        let after_open = &rest[open + 1..];
        if rest[..open].ends_with('\\') {
            out.push_str(&rest[..open + 1]);
            rest = after_open;
            continue;
        }
        let openable = matches!(
            after_open.chars().next(),
            Some(c) if !c.is_whitespace() && !c.is_ascii_digit() && c != '$'
        );
        if !openable {
            out.push_str(&rest[..open + 1]);
            rest = after_open;
            continue;
        }
        match find_closing_dollar(after_open) {
            Some(close) => {
                let expression = &after_open[..close];
                let ends_in_space = expression
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_whitespace());
                if ends_in_space {
                    out.push_str(&rest[..open + 1]);
                    rest = after_open;
                } else {
                    out.push_str(&rest[..open]);
                    let id = session.register_math(expression.to_string(), false);
                    out.push_str(&id);
                    rest = &after_open[close + 1..];
                }
            }
            None => {
                out.push_str(&rest[..open + 1]);
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
}

fn find_closing_dollar(body: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = body[from..].find('$') {
        let abs = from + rel;
        if abs == 0 {
            return None;
        }
        if body[..abs].ends_with('\\') {
            from = abs + 1;
            continue;
        }
        return Some(abs);
    }
    None
}
