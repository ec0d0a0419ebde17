use crate::escape::escape_text;
use crate::render::inline::{InlineContext, InlineRule, InlineToken};

/// `#word` tags, nested segments included (`#project/urgent`).
///
/// A `#` preceded by `:` or `/` never opens a tag (URL fragments), nor does
/// one glued to a word; the first character after `#` must be a letter, which
/// also rejects heading markers and bare numbers.
pub(crate) struct TagRule;

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}

impl InlineRule for TagRule {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn start(&self, src: &str) -> Option<usize> {
        src.find('#')
    }

    fn tokenize(
        &self,
        src: &str,
        preceding: Option<char>,
        _ctx: &InlineContext<'_>,
    ) -> Option<InlineToken> {
        let rest = src.strip_prefix('#')?;
        if matches!(preceding, Some(':') | Some('/')) {
            return None;
        }
        if matches!(preceding, Some(c) if c.is_alphanumeric()) {
            return None;
        }
        if !rest.chars().next().is_some_and(|c| c.is_alphabetic()) {
            return None;
        }

        let end = rest
            .char_indices()
            .find(|(_, c)| !is_tag_char(*c))
            .map_or(rest.len(), |(index, _)| index);
        let body = rest[..end].trim_end_matches(|c| c == '/' || c == '-');
        if body.is_empty() {
            return None;
        }

        Some(InlineToken {
            consumed: 1 + body.len(),
            html: format!(
                "<span class=\"obsidian-tag\">#{}</span>",
                escape_text(body)
            ),
        })
    }
}
