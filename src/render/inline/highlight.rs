use crate::escape::escape_text;
use crate::render::inline::{InlineContext, InlineRule, InlineToken};

/// `==text==` → `<mark>`. Greedy up to the next `==`; a stray `=` inside the
/// span disqualifies it.
pub(crate) struct HighlightRule;

impl InlineRule for HighlightRule {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn start(&self, src: &str) -> Option<usize> {
        src.find("==")
    }

    fn tokenize(
        &self,
        src: &str,
        _preceding: Option<char>,
        _ctx: &InlineContext<'_>,
    ) -> Option<InlineToken> {
        let rest = src.strip_prefix("==")?;
        let end = rest.find("==")?;
        let body = &rest[..end];
        if body.is_empty() || body.contains('=') || body.contains('\n') {
            return None;
        }
        Some(InlineToken {
            consumed: 2 + end + 2,
            html: format!("<mark>{}</mark>", escape_text(body)),
        })
    }
}
