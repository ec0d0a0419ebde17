//! Block-level renderer overrides, applied by rewriting nodes in place the
//! way the engine's own HTML formatter will consume them.
//!
//! Headings gain anchor ids, fenced code becomes either a Mermaid marker div
//! or a highlighted block with a copy-button header, annotated blockquotes
//! become callout containers, and annotated list items get their custom
//! checkbox. All replacement HTML still passes through the sanitizer.

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::options::Options;
use comrak::{Arena, format_html};
use syntect::html::ClassStyle;
use syntect::parsing::SyntaxSet;

use crate::escape::{escape_attribute, escape_text};
use crate::render::annotate::{BlockAnnotation, collect_plain_text};
use crate::render::callout::{CalloutDescriptor, render_callout};
use crate::render::highlight::highlight_code;
use crate::render::inline::alloc_node;
use crate::render::session::SENTINEL;
use crate::render::slug::AnchorSlugger;
use crate::render::types::RenderError;

/// Status characters allowed into the `data-task` attribute. Anything else
/// is replaced by a space before interpolation.
const TASK_STATUS_SAFE: &[char] = &[
    ' ', 'x', 'X', '/', '-', '>', '<', '?', '!', '*', 'l', 'i', 'S', 'b', '"',
];

#[derive(Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) contains_mermaid: bool,
}

pub(crate) fn apply_overrides<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    annotations: Vec<BlockAnnotation<'a>>,
    options: &Options<'_>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<RewriteOutcome, RenderError> {
    let mut outcome = RewriteOutcome::default();
    let mut slugger = AnchorSlugger::new();
    rewrite_blocks(
        root,
        options,
        syntax_set,
        class_style,
        &mut slugger,
        &mut outcome,
    )?;

    // Checkboxes go in before callout bodies are flattened to HTML, so a
    // task list inside a callout keeps its custom statuses.
    for annotation in &annotations {
        if let BlockAnnotation::Task { node, status } = annotation {
            inject_checkbox(arena, *node, *status);
        }
    }

    // Annotations were collected pre-order; replacing in reverse renders
    // nested callouts before the callouts that contain them.
    for annotation in annotations.iter().rev() {
        if let BlockAnnotation::Callout { node, descriptor } = annotation {
            replace_callout(*node, descriptor, options)?;
        }
    }

    Ok(outcome)
}

fn rewrite_blocks<'a>(
    node: &'a AstNode<'a>,
    options: &Options<'_>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    slugger: &mut AnchorSlugger,
    outcome: &mut RewriteOutcome,
) -> Result<(), RenderError> {
    enum Kind {
        Heading(u8),
        Code { info: String, literal: String },
        Other,
    }
    let kind = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Heading(heading) => Kind::Heading(heading.level),
            NodeValue::CodeBlock(block) => Kind::Code {
                info: block.info.trim().to_string(),
                literal: block.literal.clone(),
            },
            _ => Kind::Other,
        }
    };

    match kind {
        Kind::Heading(level) => {
            rewrite_heading(node, level, options, slugger)?;
        }
        Kind::Code { info, literal } => {
            rewrite_code_block(node, &info, &literal, syntax_set, class_style, outcome)?;
        }
        Kind::Other => {
            let mut child = node.first_child();
            while let Some(next) = child {
                child = next.next_sibling();
                rewrite_blocks(next, options, syntax_set, class_style, slugger, outcome)?;
            }
        }
    }
    Ok(())
}

fn rewrite_heading<'a>(
    node: &'a AstNode<'a>,
    level: u8,
    options: &Options<'_>,
    slugger: &mut AnchorSlugger,
) -> Result<(), RenderError> {
    let mut text = String::new();
    collect_plain_text(node, &mut text);
    let slug = slugger.anchor_for(&strip_placeholder_ids(&text));

    let mut rendered = String::new();
    format_html(node, options, &mut rendered).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    let open_tag = format!("<h{level}");
    let with_id = rendered.replacen(
        &open_tag,
        &format!("<h{level} id=\"{}\"", escape_attribute(&slug)),
        1,
    );

    while let Some(child) = node.first_child() {
        child.detach();
    }
    node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
        block_type: 0,
        literal: with_id,
    });
    Ok(())
}

fn rewrite_code_block<'a>(
    node: &'a AstNode<'a>,
    info: &str,
    literal: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    outcome: &mut RewriteOutcome,
) -> Result<(), RenderError> {
    let language = info.split_whitespace().next();

    let html = if language.is_some_and(|lang| lang.eq_ignore_ascii_case("mermaid")) {
        // Diagram rendering happens client-side, after mount; this pipeline
        // only emits the marker container with the escaped source.
        outcome.contains_mermaid = true;
        format!("<div class=\"mermaid\">{}</div>", escape_text(literal))
    } else {
        outcome.contains_code = true;
        let highlighted = highlight_code(language, literal, syntax_set, class_style)?;
        build_code_container(language.unwrap_or("text"), &highlighted)
    };

    node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
        block_type: 0,
        literal: html,
    });
    Ok(())
}

fn build_code_container(language: &str, pre_html: &str) -> String {
    format!(
        "<div class=\"code-block\"><div class=\"code-block-header\">\
         <span class=\"code-block-language\">{label}</span>\
         <button type=\"button\" class=\"code-copy-button\" data-role=\"code-copy-button\" \
         aria-label=\"Copy code to clipboard\">Copy</button>\
         </div>{pre_html}</div>",
        label = escape_text(&language.to_ascii_lowercase()),
    )
}

fn inject_checkbox<'a>(arena: &'a Arena<'a>, item: &'a AstNode<'a>, status: char) {
    let status = if TASK_STATUS_SAFE.contains(&status) {
        status
    } else {
        ' '
    };
    let checked = matches!(status, 'x' | 'X');
    let html = format!(
        "<input type=\"checkbox\" class=\"task-checkbox\" disabled=\"\" data-task=\"{status}\"{checked} /> ",
        status = escape_attribute(&status.to_string()),
        checked = if checked { " checked=\"\"" } else { "" },
    );
    let checkbox = alloc_node(arena, NodeValue::HtmlInline(html));
    if let Some(paragraph) = item.first_child() {
        if let Some(first) = paragraph.first_child() {
            first.insert_before(checkbox);
        } else {
            paragraph.append(checkbox);
        }
    }
}

fn replace_callout<'a>(
    node: &'a AstNode<'a>,
    descriptor: &CalloutDescriptor,
    options: &Options<'_>,
) -> Result<(), RenderError> {
    let mut body = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        format_html(next, options, &mut body).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;
        child = next.next_sibling();
    }

    let html = render_callout(descriptor, &body);
    while let Some(child) = node.first_child() {
        child.detach();
    }
    node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
        block_type: 0,
        literal: html,
    });
    Ok(())
}

/// Remove math/code placeholder ids from text used for anchor slugs.
fn strip_placeholder_ids(text: &str) -> String {
    if !text.contains(SENTINEL) {
        return text.to_string();
    }
    text.split(SENTINEL)
        .enumerate()
        .filter(|(index, _)| index % 2 == 0)
        .map(|(_, segment)| segment)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::strip_placeholder_ids;
    use crate::render::session::SENTINEL;

    #[test]
    fn placeholder_ids_vanish_from_slug_text() {
        let text = format!("Euler {SENTINEL}m0{SENTINEL} identity");
        assert_eq!(strip_placeholder_ids(&text), "Euler  identity");
    }
}
