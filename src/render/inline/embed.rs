use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::escape::{escape_attribute, escape_text};
use crate::render::inline::{InlineContext, InlineRule, InlineToken};

/// `![[target]]` / `![[target|size]]` embeds, dispatched by file extension.
///
/// Images resolve against the share's asset route when a slug is in context;
/// audio and video render placeholder cards; anything else is a note embed,
/// rendered as a card that carries the resolved display name when the folder
/// listing contains the target. Full transclusion of note content is out of
/// scope.
pub(crate) struct EmbedRule;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "bmp", "ico",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "ogv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "oga", "flac", "m4a", "opus"];

/// Characters percent-encoded inside asset path segments. `/` stays literal
/// so vault sub-paths survive.
const ASSET_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'\\');

impl InlineRule for EmbedRule {
    fn name(&self) -> &'static str {
        "embed"
    }

    fn start(&self, src: &str) -> Option<usize> {
        src.find("![[")
    }

    fn tokenize(
        &self,
        src: &str,
        _preceding: Option<char>,
        ctx: &InlineContext<'_>,
    ) -> Option<InlineToken> {
        let rest = src.strip_prefix("![[")?;
        let end = rest.find("]]")?;
        let inner = &rest[..end];
        if inner.is_empty() || inner.contains('\n') {
            return None;
        }

        let (target, param) = match inner.split_once('|') {
            Some((target, param)) => (target.trim(), Some(param.trim())),
            None => (inner.trim(), None),
        };
        if target.is_empty() {
            return None;
        }

        let extension = target
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let html = match extension.as_deref() {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => image_embed(target, param, ctx),
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => media_card(target, "video"),
            Some(ext) if AUDIO_EXTENSIONS.contains(&ext) => media_card(target, "audio"),
            _ => note_card(target, ctx),
        };

        Some(InlineToken {
            consumed: 3 + end + 2,
            html,
        })
    }
}

fn image_embed(target: &str, param: Option<&str>, ctx: &InlineContext<'_>) -> String {
    let Some(slug) = ctx.slug else {
        return format!(
            "<span class=\"embed-placeholder embed-image\">Image: {}</span>",
            escape_text(target)
        );
    };

    let src = format!(
        "/{}/_assets/{}",
        utf8_percent_encode(slug, ASSET_PATH),
        utf8_percent_encode(target, ASSET_PATH),
    );
    let mut html = format!(
        "<img class=\"embed-image\" src=\"{src}\" alt=\"{alt}\" loading=\"lazy\"",
        src = escape_attribute(&src),
        alt = escape_attribute(target),
    );
    if let Some((width, height)) = param.and_then(parse_embed_size) {
        html.push_str(&format!(" width=\"{width}\""));
        if let Some(height) = height {
            html.push_str(&format!(" height=\"{height}\""));
        }
    }
    html.push_str(" />");
    html
}

/// `|300` sets width, `|300x200` sets both.
fn parse_embed_size(param: &str) -> Option<(u32, Option<u32>)> {
    if let Some((width, height)) = param.split_once('x') {
        let width: u32 = width.trim().parse().ok()?;
        let height: u32 = height.trim().parse().ok()?;
        (width > 0 && height > 0).then_some((width, Some(height)))
    } else {
        let width: u32 = param.parse().ok()?;
        (width > 0).then_some((width, None))
    }
}

fn media_card(target: &str, kind: &str) -> String {
    format!(
        "<span class=\"embed-card embed-media embed-{kind}\">\
         <span class=\"embed-card-icon\" aria-hidden=\"true\">\u{25B6}</span>\
         <span class=\"embed-card-name\">{name}</span></span>",
        name = escape_text(target),
    )
}

fn note_card(target: &str, ctx: &InlineContext<'_>) -> String {
    let resolved = ctx
        .folder_items
        .iter()
        .find(|item| item.path == target || item.path == format!("{target}.md"));

    match resolved {
        Some(item) => format!(
            "<span class=\"embed-card embed-note embed-note-found\" data-embed-path=\"{path}\">\
             <span class=\"embed-card-icon\" aria-hidden=\"true\">\u{1F4C4}</span>\
             <span class=\"embed-card-name\">{name}</span></span>",
            path = escape_attribute(&item.path),
            name = escape_text(&item.name),
        ),
        None => format!(
            "<span class=\"embed-card embed-note\">\
             <span class=\"embed-card-icon\" aria-hidden=\"true\">\u{1F4C4}</span>\
             <span class=\"embed-card-name\">{name}</span>\
             <span class=\"embed-card-hint\">Embedded note</span></span>",
            name = escape_text(target),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::inline::InlineRule;
    use crate::render::types::FolderItem;

    fn tokenize(src: &str, ctx: &InlineContext<'_>) -> Option<String> {
        EmbedRule
            .tokenize(src, None, ctx)
            .map(|token| token.html)
    }

    #[test]
    fn image_with_slug_builds_asset_url() {
        let ctx = InlineContext {
            slug: Some("my-share"),
            folder_items: &[],
        };
        let html = tokenize("![[Pasted Image.png]]", &ctx).expect("match");
        assert!(html.contains("src=\"/my-share/_assets/Pasted%20Image.png\""));
    }

    #[test]
    fn image_without_slug_renders_placeholder() {
        let ctx = InlineContext {
            slug: None,
            folder_items: &[],
        };
        let html = tokenize("![[photo.png]]", &ctx).expect("match");
        assert!(html.contains("embed-placeholder"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn image_size_parameter_sets_dimensions() {
        let ctx = InlineContext {
            slug: Some("s"),
            folder_items: &[],
        };
        let html = tokenize("![[a.png|300x200]]", &ctx).expect("match");
        assert!(html.contains("width=\"300\""));
        assert!(html.contains("height=\"200\""));
    }

    #[test]
    fn note_embed_resolves_against_folder_items() {
        let items = vec![FolderItem::doc("Projects/Roadmap.md", "Roadmap")];
        let ctx = InlineContext {
            slug: None,
            folder_items: &items,
        };
        let html = tokenize("![[Projects/Roadmap]]", &ctx).expect("match");
        assert!(html.contains("embed-note-found"));
        assert!(html.contains("Roadmap"));
    }

    #[test]
    fn unresolved_note_embed_renders_generic_card() {
        let ctx = InlineContext {
            slug: None,
            folder_items: &[],
        };
        let html = tokenize("![[Missing Note]]", &ctx).expect("match");
        assert!(html.contains("Embedded note"));
        assert!(!html.contains("embed-note-found"));
    }

    #[test]
    fn media_embed_renders_card() {
        let ctx = InlineContext {
            slug: Some("s"),
            folder_items: &[],
        };
        let html = tokenize("![[talk.mp4]]", &ctx).expect("match");
        assert!(html.contains("embed-video"));
    }
}
