//! Token-tree annotation pass.
//!
//! One walk over the parsed tree classifies blockquotes as callouts and list
//! items as task items, producing explicit [`BlockAnnotation`] values rather
//! than mutating foreign token shapes. The only tree surgery done here is
//! removing what the annotations replace: the callout header line and the
//! task marker text. Rendering happens later, in the override pass.

use comrak::nodes::{AstNode, NodeValue};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::render::callout::{CalloutDescriptor, default_title};

/// Dialect classification attached to a block node.
pub(crate) enum BlockAnnotation<'a> {
    Callout {
        node: &'a AstNode<'a>,
        descriptor: CalloutDescriptor,
    },
    Task {
        node: &'a AstNode<'a>,
        status: char,
    },
}

static CALLOUT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[!(\w+)\]([+-])?[ \t]*(.*)$").expect("callout header pattern"));

/// The status character is re-derived from the item's raw marker text rather
/// than any engine-provided checked flag: the dialect supports statuses far
/// beyond `x`/space, and engines collapse those to a boolean.
static TASK_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(.)\][ \t]+").expect("task marker pattern"));

pub(crate) fn annotate<'a>(root: &'a AstNode<'a>) -> Vec<BlockAnnotation<'a>> {
    let mut annotations = Vec::new();
    visit(root, &mut annotations);
    annotations
}

fn visit<'a>(node: &'a AstNode<'a>, out: &mut Vec<BlockAnnotation<'a>>) {
    enum Kind {
        Quote,
        Item,
        Other,
    }
    let kind = {
        let data = node.data.borrow();
        match data.value {
            NodeValue::BlockQuote => Kind::Quote,
            NodeValue::Item(_) => Kind::Item,
            _ => Kind::Other,
        }
    };

    match kind {
        Kind::Quote => {
            if let Some(descriptor) = classify_callout(node) {
                out.push(BlockAnnotation::Callout { node, descriptor });
            }
        }
        Kind::Item => {
            if let Some(status) = classify_task(node) {
                out.push(BlockAnnotation::Task { node, status });
            }
        }
        Kind::Other => {}
    }

    let mut child = node.first_child();
    while let Some(next) = child {
        child = next.next_sibling();
        visit(next, out);
    }
}

/// Inspect a blockquote's first paragraph line for a `[!type]` header. On a
/// match the header line is removed from the paragraph; if nothing remains,
/// the paragraph itself is removed.
fn classify_callout<'a>(quote: &'a AstNode<'a>) -> Option<CalloutDescriptor> {
    let paragraph = quote.first_child()?;
    {
        let data = paragraph.data.borrow();
        if !matches!(data.value, NodeValue::Paragraph) {
            return None;
        }
    }

    let mut header_nodes = Vec::new();
    let mut line_break = None;
    let mut child = paragraph.first_child();
    while let Some(node) = child {
        let is_break = {
            let data = node.data.borrow();
            matches!(data.value, NodeValue::SoftBreak | NodeValue::LineBreak)
        };
        if is_break {
            line_break = Some(node);
            break;
        }
        header_nodes.push(node);
        child = node.next_sibling();
    }

    let mut header_text = String::new();
    for node in &header_nodes {
        collect_plain_text(node, &mut header_text);
    }
    let captures = CALLOUT_HEADER.captures(header_text.trim())?;

    let kind = captures[1].to_lowercase();
    let marker = captures.get(2).map(|m| m.as_str());
    let remainder = captures[3].trim();
    let descriptor = CalloutDescriptor {
        title: if remainder.is_empty() {
            default_title(&kind)
        } else {
            remainder.to_string()
        },
        kind,
        foldable: marker.is_some(),
        default_open: marker != Some("-"),
    };

    for node in header_nodes {
        node.detach();
    }
    if let Some(break_node) = line_break {
        break_node.detach();
    }
    if paragraph.first_child().is_none() {
        paragraph.detach();
    }

    Some(descriptor)
}

/// Match and strip a `[c] ` marker from the item's leading text, returning
/// the raw status character.
fn classify_task<'a>(item: &'a AstNode<'a>) -> Option<char> {
    let paragraph = item.first_child()?;
    {
        let data = paragraph.data.borrow();
        if !matches!(data.value, NodeValue::Paragraph) {
            return None;
        }
    }
    let first = paragraph.first_child()?;
    let mut data = first.data.borrow_mut();
    let NodeValue::Text(text) = &mut data.value else {
        return None;
    };

    let (status, marker_end) = {
        let captures = TASK_MARKER.captures(text)?;
        (captures[1].chars().next()?, captures.get(0)?.end())
    };
    let tail = text[marker_end..].to_string();
    *text = tail.into();
    Some(status)
}

/// Flatten a node's inline subtree to plain text (code literals included,
/// breaks as spaces).
pub(crate) fn collect_plain_text(node: &AstNode<'_>, buffer: &mut String) {
    {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Text(text) => buffer.push_str(text),
            NodeValue::Code(code) => buffer.push_str(&code.literal),
            NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
            _ => {}
        }
    }
    let mut child = node.first_child();
    while let Some(next) = child {
        collect_plain_text(next, buffer);
        child = next.next_sibling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::{Arena, parse_document};

    use crate::render::config::default_options;

    #[test]
    fn classifies_callout_blockquotes() {
        let arena = Arena::new();
        let options = default_options();
        let root = parse_document(&arena, "> [!WARNING] Careful\n> body text\n", &options);
        let annotations = annotate(root);
        assert_eq!(annotations.len(), 1);
        match &annotations[0] {
            BlockAnnotation::Callout { descriptor, .. } => {
                assert_eq!(descriptor.kind, "warning");
                assert_eq!(descriptor.title, "Careful");
                assert!(!descriptor.foldable);
                assert!(descriptor.default_open);
            }
            _ => panic!("expected a callout annotation"),
        }
    }

    #[test]
    fn fold_marker_controls_default_state() {
        let arena = Arena::new();
        let options = default_options();
        let root = parse_document(&arena, "> [!tip]- Hidden\n> x\n", &options);
        let annotations = annotate(root);
        match &annotations[0] {
            BlockAnnotation::Callout { descriptor, .. } => {
                assert!(descriptor.foldable);
                assert!(!descriptor.default_open);
            }
            _ => panic!("expected a callout annotation"),
        }
    }

    #[test]
    fn empty_title_falls_back_to_type_name() {
        let arena = Arena::new();
        let options = default_options();
        let root = parse_document(&arena, "> [!note]\n> body\n", &options);
        let annotations = annotate(root);
        match &annotations[0] {
            BlockAnnotation::Callout { descriptor, .. } => {
                assert_eq!(descriptor.title, "Note");
            }
            _ => panic!("expected a callout annotation"),
        }
    }

    #[test]
    fn ordinary_blockquotes_are_untouched() {
        let arena = Arena::new();
        let options = default_options();
        let root = parse_document(&arena, "> just a quote\n", &options);
        assert!(annotate(root).is_empty());
    }

    #[test]
    fn custom_task_statuses_are_derived_from_source() {
        let arena = Arena::new();
        let options = default_options();
        let root = parse_document(&arena, "- [/] in progress\n- [x] done\n- plain\n", &options);
        let annotations = annotate(root);
        let statuses: Vec<char> = annotations
            .iter()
            .filter_map(|annotation| match annotation {
                BlockAnnotation::Task { status, .. } => Some(*status),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec!['/', 'x']);
    }
}
