//! Callout classification and rendering.
//!
//! The alias table mirrors the set Obsidian documents: ~30 type aliases
//! folding into 13 visual buckets, each with an icon glyph and a color class.
//! Unknown types render with the `note` treatment.

use crate::escape::{escape_attribute, escape_text};

/// Classification of a blockquote carrying a `[!type]` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CalloutDescriptor {
    /// Lower-cased type as written, e.g. `tldr`.
    pub(crate) kind: String,
    pub(crate) title: String,
    pub(crate) foldable: bool,
    pub(crate) default_open: bool,
}

pub(crate) struct CalloutStyle {
    pub(crate) bucket: &'static str,
    pub(crate) icon: &'static str,
}

const STYLES: &[(&[&str], CalloutStyle)] = &[
    (
        &["note"],
        CalloutStyle {
            bucket: "note",
            icon: "\u{270E}",
        },
    ),
    (
        &["abstract", "summary", "tldr"],
        CalloutStyle {
            bucket: "abstract",
            icon: "\u{1F4CB}",
        },
    ),
    (
        &["info"],
        CalloutStyle {
            bucket: "info",
            icon: "\u{2139}",
        },
    ),
    (
        &["todo"],
        CalloutStyle {
            bucket: "todo",
            icon: "\u{2611}",
        },
    ),
    (
        &["tip", "hint", "important"],
        CalloutStyle {
            bucket: "tip",
            icon: "\u{1F525}",
        },
    ),
    (
        &["success", "check", "done"],
        CalloutStyle {
            bucket: "success",
            icon: "\u{2714}",
        },
    ),
    (
        &["question", "help", "faq"],
        CalloutStyle {
            bucket: "question",
            icon: "\u{2753}",
        },
    ),
    (
        &["warning", "caution", "attention"],
        CalloutStyle {
            bucket: "warning",
            icon: "\u{26A0}",
        },
    ),
    (
        &["failure", "fail", "missing"],
        CalloutStyle {
            bucket: "failure",
            icon: "\u{2716}",
        },
    ),
    (
        &["danger", "error"],
        CalloutStyle {
            bucket: "danger",
            icon: "\u{26A1}",
        },
    ),
    (
        &["bug"],
        CalloutStyle {
            bucket: "bug",
            icon: "\u{1F41E}",
        },
    ),
    (
        &["example"],
        CalloutStyle {
            bucket: "example",
            icon: "\u{1F4D1}",
        },
    ),
    (
        &["quote", "cite"],
        CalloutStyle {
            bucket: "quote",
            icon: "\u{275D}",
        },
    ),
];

pub(crate) fn style_for(kind: &str) -> &'static CalloutStyle {
    STYLES
        .iter()
        .find(|(aliases, _)| aliases.contains(&kind))
        .map(|(_, style)| style)
        .unwrap_or(&STYLES[0].1)
}

/// Build the callout container around the already-rendered body HTML.
pub(crate) fn render_callout(descriptor: &CalloutDescriptor, body_html: &str) -> String {
    let style = style_for(&descriptor.kind);
    let kind_attr = escape_attribute(&descriptor.kind);
    let title = escape_text(&descriptor.title);
    let header = format!(
        "<span class=\"callout-icon\" aria-hidden=\"true\">{icon}</span>\
         <span class=\"callout-title-text\">{title}</span>",
        icon = style.icon,
    );
    let body = if body_html.trim().is_empty() {
        String::new()
    } else {
        format!("<div class=\"callout-content\">\n{body_html}</div>\n")
    };

    if descriptor.foldable {
        let open = if descriptor.default_open { " open" } else { "" };
        format!(
            "<details class=\"callout callout-{bucket}\" data-callout=\"{kind_attr}\"{open}>\n\
             <summary class=\"callout-title\">{header}</summary>\n{body}</details>",
            bucket = style.bucket,
        )
    } else {
        format!(
            "<div class=\"callout callout-{bucket}\" data-callout=\"{kind_attr}\">\n\
             <div class=\"callout-title\">{header}</div>\n{body}</div>",
            bucket = style.bucket,
        )
    }
}

/// Title-case a callout type for use as the default title.
pub(crate) fn default_title(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
