use crate::escape::{escape_attribute, escape_text};
use crate::render::inline::{InlineContext, InlineRule, InlineToken};
use crate::render::slug::anchor_slug;

/// `[[target]]` / `[[target|display]]`.
///
/// Targets beginning with `#` become in-page heading links, slugified with
/// the same rule heading ids use. Every other wikilink renders inert, as an
/// `href="#"` anchor marked `data-wikilink-disabled`, since the linked note
/// may not exist as a standalone page in the publish context.
pub(crate) struct WikilinkRule;

impl InlineRule for WikilinkRule {
    fn name(&self) -> &'static str {
        "wikilink"
    }

    fn start(&self, src: &str) -> Option<usize> {
        // Skip `[[` owned by an embed (`![[`); the embed rule consumes those.
        let mut from = 0;
        while let Some(rel) = src[from..].find("[[") {
            let abs = from + rel;
            if src[..abs].ends_with('!') {
                from = abs + 2;
                continue;
            }
            return Some(abs);
        }
        None
    }

    fn tokenize(
        &self,
        src: &str,
        preceding: Option<char>,
        _ctx: &InlineContext<'_>,
    ) -> Option<InlineToken> {
        if preceding == Some('!') {
            return None;
        }
        let rest = src.strip_prefix("[[")?;
        let end = rest.find("]]")?;
        let inner = &rest[..end];
        if inner.is_empty() || inner.contains('\n') || inner.contains("[[") {
            return None;
        }

        let (target, display) = match inner.split_once('|') {
            Some((target, display)) => (target.trim(), Some(display.trim())),
            None => (inner.trim(), None),
        };
        if target.is_empty() {
            return None;
        }

        let html = if let Some(heading) = target.strip_prefix('#') {
            let label = display.filter(|d| !d.is_empty()).unwrap_or(heading);
            format!(
                "<a href=\"#{anchor}\" class=\"wikilink wikilink-heading\">{text}</a>",
                anchor = escape_attribute(&anchor_slug(heading)),
                text = escape_text(label),
            )
        } else {
            let label = display.filter(|d| !d.is_empty()).unwrap_or(target);
            format!(
                "<a href=\"#\" class=\"wikilink\" data-wikilink-disabled=\"true\">{text}</a>",
                text = escape_text(label),
            )
        };

        Some(InlineToken {
            consumed: 2 + end + 2,
            html,
        })
    }
}
