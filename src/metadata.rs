//! Derived document metadata: title, description, reading time.
//!
//! These helpers mine the same raw markdown the renderer consumes but are
//! independent of it: callers use them for `<title>`, meta tags and list
//! views without paying for a full render.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::render::{split_frontmatter, strip_comments};

const DESCRIPTION_LIMIT: usize = 160;
const WORDS_PER_MINUTE: f32 = 200.0;

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}[ \t]+(.*?)[ \t]*#*[ \t]*$").expect("heading pattern"));
static EMBED_OR_WIKILINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!?\[\[([^\]\|]+)(?:\|([^\]]*))?\]\]").expect("wikilink pattern")
});
static MD_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("image pattern"));
static MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link pattern"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

/// Title for a document: frontmatter `title:` wins, then the first ATX
/// heading, then the caller's fallback.
pub fn extract_title(markdown: &str, fallback: &str) -> String {
    let (frontmatter, body) = split_frontmatter(markdown);
    if let Some(block) = frontmatter {
        if let Some(title) = frontmatter_value(block, "title") {
            let title = title.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    let body = strip_comments(body);
    let mut in_fence = false;
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(captures) = HEADING_LINE.captures(trimmed) {
            let heading = strip_inline_markers(&captures[1]);
            if !heading.is_empty() {
                return heading;
            }
        }
    }

    fallback.to_string()
}

/// Description for a document: frontmatter `description:` wins, then the
/// first plain-prose paragraph (headings, code, callout headers skipped)
/// with markdown markers stripped, truncated to 160 characters.
pub fn extract_description(markdown: &str, fallback: &str) -> String {
    let (frontmatter, body) = split_frontmatter(markdown);
    if let Some(block) = frontmatter {
        if let Some(description) = frontmatter_value(block, "description") {
            let description = description.trim();
            if !description.is_empty() {
                return truncate_with_ellipsis(description);
            }
        }
    }

    let body = strip_comments(body);
    let mut in_fence = false;
    let mut paragraph: Vec<String> = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() {
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        if HEADING_LINE.is_match(trimmed) {
            continue;
        }
        if let Some(quoted) = trimmed.strip_prefix('>') {
            let quoted = quoted.trim_start();
            if quoted.starts_with("[!") {
                continue;
            }
            if !quoted.is_empty() {
                paragraph.push(quoted.to_string());
            }
            continue;
        }
        paragraph.push(trimmed.to_string());
    }

    let text = strip_inline_markers(&paragraph.join(" "));
    if text.is_empty() {
        return fallback.to_string();
    }
    truncate_with_ellipsis(&text)
}

/// Estimated reading time in whole minutes at 200 words per minute. An empty
/// document reads in zero minutes.
pub fn estimate_reading_time(markdown: &str) -> u32 {
    let (_, body) = split_frontmatter(markdown);
    let body = strip_comments(body);
    let words = body.split_whitespace().count();
    if words == 0 {
        0
    } else {
        (words as f32 / WORDS_PER_MINUTE).ceil() as u32
    }
}

/// Pull a scalar value out of a frontmatter block.
fn frontmatter_value(block: &str, key: &str) -> Option<String> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(block).ok()?;
    let value = parsed.get(key)?;
    match value {
        serde_yaml::Value::String(text) => Some(text.clone()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Flatten markdown syntax out of a line of prose.
fn strip_inline_markers(text: &str) -> String {
    let text = EMBED_OR_WIKILINK.replace_all(text, |captures: &regex::Captures<'_>| {
        captures
            .get(2)
            .map(|display| display.as_str())
            .filter(|display| !display.trim().is_empty())
            .unwrap_or_else(|| captures.get(1).map_or("", |target| target.as_str()))
            .to_string()
    });
    let text = MD_IMAGE.replace_all(&text, "$1");
    let text = MD_LINK.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, "");
    let text: String = text
        .chars()
        .filter(|&c| !matches!(c, '*' | '~' | '`' | '$' | '='))
        .collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_with_ellipsis(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(DESCRIPTION_LIMIT).collect();
    truncated.push('\u{2026}');
    truncated
}
