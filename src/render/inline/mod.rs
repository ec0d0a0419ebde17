//! Inline-level dialect extensions.
//!
//! Each extension is an [`InlineRule`]: a named tokenizer with a cheap
//! `start` scan and a `tokenize` attempt, evaluated in registration order
//! (embed before wikilink, since `![[` owns its `[[`, then highlight, then
//! tag).
//! The driver walks the parsed tree's text nodes and splits matched spans
//! into `HtmlInline` fragments; everything an extension emits is escaped by
//! construction and still passes the sanitizer afterwards.
//!
//! Rules are pure: per-render state (share slug, folder listing) arrives
//! through [`InlineContext`], never through anything shared between calls.

mod embed;
mod highlight;
mod tag;
mod wikilink;

use std::cell::RefCell;

use comrak::Arena;
use comrak::nodes::{Ast, AstNode, LineColumn, NodeValue};

use crate::render::types::FolderItem;

pub(crate) use embed::EmbedRule;
pub(crate) use highlight::HighlightRule;
pub(crate) use tag::TagRule;
pub(crate) use wikilink::WikilinkRule;

/// Borrowed view of the render session handed to inline tokenizers.
pub(crate) struct InlineContext<'a> {
    pub(crate) slug: Option<&'a str>,
    pub(crate) folder_items: &'a [FolderItem],
}

/// A successful tokenizer match: how many bytes it consumed and the HTML
/// fragment it renders to.
pub(crate) struct InlineToken {
    pub(crate) consumed: usize,
    pub(crate) html: String,
}

pub(crate) trait InlineRule: Sync {
    fn name(&self) -> &'static str;

    /// Byte offset of the next position in `src` worth attempting, if any.
    fn start(&self, src: &str) -> Option<usize>;

    /// Try to consume a token at the beginning of `src`. `preceding` is the
    /// character immediately before `src` within the surrounding text node.
    fn tokenize(
        &self,
        src: &str,
        preceding: Option<char>,
        ctx: &InlineContext<'_>,
    ) -> Option<InlineToken>;
}

static EMBED: EmbedRule = EmbedRule;
static WIKILINK: WikilinkRule = WikilinkRule;
static HIGHLIGHT: HighlightRule = HighlightRule;
static TAG: TagRule = TagRule;

pub(crate) fn default_rules() -> &'static [&'static dyn InlineRule] {
    static RULES: [&'static dyn InlineRule; 4] = [&EMBED, &WIKILINK, &HIGHLIGHT, &TAG];
    &RULES
}

pub(crate) fn alloc_node<'a>(
    arena: &'a Arena<'a>,
    value: NodeValue,
) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(RefCell::new(Ast::new(
        value,
        LineColumn { line: 0, column: 0 },
    ))))
}

/// Run the inline rules over every text node of the tree.
///
/// Text inside links and images is skipped: an autolinked URL must not grow
/// tags out of its fragment, and dialect syntax inside explicit link text is
/// left alone.
pub(crate) fn apply_inline_rules<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    ctx: &InlineContext<'_>,
) {
    let mut text_nodes = Vec::new();
    collect_text_nodes(root, &mut text_nodes);

    for node in text_nodes {
        let text = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => text.clone(),
                _ => continue,
            }
        };
        let Some(segments) = segment_text(&text, default_rules(), ctx) else {
            continue;
        };

        let mut segments = segments.into_iter();
        let first = segments.next().expect("segmentation is never empty");
        node.data.borrow_mut().value = first.into_node_value();
        let mut anchor = node;
        for segment in segments {
            let new_node = alloc_node(arena, segment.into_node_value());
            anchor.insert_after(new_node);
            anchor = new_node;
        }
    }
}

fn collect_text_nodes<'a>(node: &'a AstNode<'a>, out: &mut Vec<&'a AstNode<'a>>) {
    {
        let data = node.data.borrow();
        match data.value {
            NodeValue::Link(_) | NodeValue::Image(_) => return,
            NodeValue::Text(_) => {
                drop(data);
                out.push(node);
                return;
            }
            _ => {}
        }
    }
    let mut child = node.first_child();
    while let Some(next) = child {
        collect_text_nodes(next, out);
        child = next.next_sibling();
    }
}

enum Segment {
    Text(String),
    Html(String),
}

impl Segment {
    fn into_node_value(self) -> NodeValue {
        match self {
            Segment::Text(text) => NodeValue::Text(text.into()),
            Segment::Html(html) => NodeValue::HtmlInline(html.into()),
        }
    }
}

/// Split `text` into literal and rendered segments. Returns `None` when no
/// rule matched anywhere, so the caller can leave the node untouched.
fn segment_text(
    text: &str,
    rules: &[&dyn InlineRule],
    ctx: &InlineContext<'_>,
) -> Option<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let window = &text[cursor..];
        let mut earliest: Option<usize> = None;
        for rule in rules {
            if let Some(offset) = rule.start(window) {
                let absolute = cursor + offset;
                earliest = Some(earliest.map_or(absolute, |best| best.min(absolute)));
            }
        }
        let Some(position) = earliest else { break };

        let preceding = text[..position].chars().next_back();
        let mut matched = None;
        for rule in rules {
            if let Some(token) = rule.tokenize(&text[position..], preceding, ctx) {
                tracing::trace!(rule = rule.name(), "inline extension matched");
                matched = Some(token);
                break;
            }
        }

        match matched {
            Some(token) => {
                if position > plain_start {
                    segments.push(Segment::Text(text[plain_start..position].to_string()));
                }
                segments.push(Segment::Html(token.html));
                cursor = position + token.consumed;
                plain_start = cursor;
            }
            None => {
                let step = text[position..].chars().next().map_or(1, char::len_utf8);
                cursor = position + step;
            }
        }
    }

    if segments.is_empty() {
        return None;
    }
    if plain_start < text.len() {
        segments.push(Segment::Text(text[plain_start..].to_string()));
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InlineContext<'static> {
        InlineContext {
            slug: None,
            folder_items: &[],
        }
    }

    fn render_segments(text: &str) -> Option<String> {
        segment_text(text, default_rules(), &ctx()).map(|segments| {
            segments
                .into_iter()
                .map(|segment| match segment {
                    Segment::Text(t) => t,
                    Segment::Html(h) => h,
                })
                .collect()
        })
    }

    #[test]
    fn plain_text_is_left_untouched() {
        assert!(render_segments("nothing special here").is_none());
    }

    #[test]
    fn highlight_becomes_mark() {
        let html = render_segments("say ==this== loud").expect("match");
        assert_eq!(html, "say <mark>this</mark> loud");
    }

    #[test]
    fn wikilink_renders_disabled_anchor() {
        let html = render_segments("see [[Other Note]]").expect("match");
        assert!(html.contains("data-wikilink-disabled"));
        assert!(html.contains(">Other Note</a>"));
    }

    #[test]
    fn wikilink_pipe_sets_display_text() {
        let html = render_segments("[[Note|Display]]").expect("match");
        assert!(html.contains(">Display</a>"));
        assert!(!html.contains(">Note</a>"));
    }

    #[test]
    fn heading_wikilink_links_in_page() {
        let html = render_segments("[[#My Heading]]").expect("match");
        assert!(html.contains("href=\"#my-heading\""));
    }

    #[test]
    fn embed_takes_precedence_over_wikilink() {
        let html = render_segments("![[note]]").expect("match");
        assert!(html.contains("embed-card"));
        assert!(!html.contains("data-wikilink-disabled"));
    }

    #[test]
    fn nested_tag_matches() {
        let html = render_segments("tagged #project/urgent now").expect("match");
        assert!(html.contains("<span class=\"obsidian-tag\">#project/urgent</span>"));
    }

    #[test]
    fn url_fragment_is_not_a_tag() {
        assert!(render_segments("https://x.com#frag").is_none());
    }

    #[test]
    fn unterminated_dialect_stays_literal() {
        assert!(render_segments("broken [[link and ==mark").is_none());
    }
}
