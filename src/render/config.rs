use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

/// Comrak options for the dialect.
///
/// The engine supplies CommonMark + GFM; the dialect layers (tasks with
/// custom statuses, `$`-math, wikilinks, frontmatter) are handled by this
/// crate's own passes, so the corresponding built-in extensions stay off.
/// `unsafe_` rendering is deliberate: raw HTML must flow through to the
/// sanitizer, which owns the allow/deny decision.
pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.full_info_string = true;
    render.r#unsafe = true;
    render.gfm_quirks = true;

    options
}

/// The allowlist gate every rendered document passes through last.
///
/// Covers everything the pipeline's own renderers can emit (structural
/// HTML, `mark`, callout `details`/`summary`, the code-copy `button`, task
/// `input`, footnote `section`/`sup`, the KaTeX HTML+MathML output and the
/// SVG vocabulary KaTeX and client-rendered Mermaid need) and nothing that
/// can execute script: no `script` tag, no handler attributes, no
/// `javascript:` scheme.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "button",
        "code",
        "del",
        "details",
        "div",
        "dl",
        "dt",
        "dd",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "summary",
        "sup",
        "u",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
        // KaTeX MathML output
        "math",
        "semantics",
        "annotation",
        "annotation-xml",
        "mrow",
        "mi",
        "mo",
        "mn",
        "ms",
        "mtext",
        "mspace",
        "msup",
        "msub",
        "msubsup",
        "mfrac",
        "mroot",
        "msqrt",
        "mstyle",
        "mpadded",
        "mphantom",
        "menclose",
        "merror",
        "mover",
        "munder",
        "munderover",
        "mmultiscripts",
        "mprescripts",
        "mtable",
        "mtr",
        "mtd",
        "mlabeledtr",
        "mglyph",
        "none",
        // SVG needed by KaTeX stretchy glyphs and client-rendered Mermaid
        "svg",
        "g",
        "path",
        "rect",
        "circle",
        "ellipse",
        "polygon",
        "polyline",
        "line",
        "marker",
        "defs",
        "linearGradient",
        "lineargradient",
        "stop",
        "title",
        "desc",
        "text",
        "tspan",
        "use",
        "clipPath",
        "clippath",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "style",
    ]);
    builder.generic_attributes(generic);
    builder.add_generic_attribute_prefixes(&["data-"]);

    builder.add_tag_attributes("a", &["href", "target"]);
    builder.add_tag_attributes(
        "img",
        &[
            "src", "alt", "title", "width", "height", "loading", "decoding",
        ],
    );
    builder.add_tag_attributes("details", &["open"]);
    builder.add_tag_attributes("button", &["type", "disabled"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("code", &["data-language"]);
    builder.add_tag_attributes("pre", &["data-language"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("math", &["xmlns", "display"]);
    builder.add_tag_attributes("annotation", &["encoding"]);
    builder.add_tag_attributes(
        "mo",
        &[
            "fence",
            "separator",
            "stretchy",
            "symmetric",
            "accent",
            "lspace",
            "rspace",
            "movablelimits",
        ],
    );
    builder.add_tag_attributes("mi", &["mathvariant"]);
    builder.add_tag_attributes("mspace", &["width", "height", "depth"]);
    builder.add_tag_attributes(
        "mstyle",
        &["scriptlevel", "displaystyle", "mathcolor", "mathbackground"],
    );
    builder.add_tag_attributes("mfrac", &["linethickness"]);
    builder.add_tag_attributes(
        "mpadded",
        &["width", "height", "depth", "lspace", "voffset"],
    );
    builder.add_tag_attributes("menclose", &["notation"]);
    builder.add_tag_attributes("mtable", &["columnalign", "rowspacing", "columnspacing"]);
    builder.add_tag_attributes("mtd", &["columnalign"]);
    builder.add_tag_attributes(
        "svg",
        &[
            "viewBox",
            "xmlns",
            "xmlns:xlink",
            "width",
            "height",
            "preserveAspectRatio",
            "version",
        ],
    );
    builder.add_tag_attributes("g", &["transform", "id", "data-name"]);
    builder.add_tag_attributes(
        "path",
        &[
            "d",
            "fill",
            "stroke",
            "stroke-width",
            "stroke-linecap",
            "stroke-linejoin",
            "marker-end",
            "marker-start",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "rect",
        &[
            "x", "y", "width", "height", "rx", "ry", "fill", "stroke", "stroke-width", "opacity",
        ],
    );
    builder.add_tag_attributes(
        "circle",
        &["cx", "cy", "r", "fill", "stroke", "stroke-width", "opacity"],
    );
    builder.add_tag_attributes(
        "ellipse",
        &[
            "cx",
            "cy",
            "rx",
            "ry",
            "fill",
            "stroke",
            "stroke-width",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "polygon",
        &["points", "fill", "stroke", "stroke-width", "opacity"],
    );
    builder.add_tag_attributes(
        "polyline",
        &["points", "fill", "stroke", "stroke-width", "opacity"],
    );
    builder.add_tag_attributes(
        "line",
        &["x1", "x2", "y1", "y2", "stroke", "stroke-width", "opacity"],
    );
    builder.add_tag_attributes(
        "marker",
        &[
            "id",
            "refX",
            "refY",
            "orient",
            "markerWidth",
            "markerHeight",
            "viewBox",
        ],
    );
    builder.add_tag_attributes(
        "text",
        &[
            "x",
            "y",
            "fill",
            "stroke",
            "text-anchor",
            "dominant-baseline",
            "font-size",
        ],
    );
    builder.add_tag_attributes("tspan", &["x", "y", "dx", "dy", "font-size", "fill"]);
    builder.add_tag_attributes(
        "linearGradient",
        &["id", "gradientUnits", "x1", "x2", "y1", "y2"],
    );
    builder.add_tag_attributes(
        "lineargradient",
        &["id", "gradientUnits", "x1", "x2", "y1", "y2"],
    );
    builder.add_tag_attributes("stop", &["offset", "stop-color", "stop-opacity"]);
    builder.add_tag_attributes("use", &["href", "xlink:href", "x", "y", "width", "height"]);
    builder.add_tag_attributes("clipPath", &["id"]);
    builder.add_tag_attributes("clippath", &["id"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder.attribute_filter(|_element, attribute, value| {
        if attribute.eq_ignore_ascii_case("style") {
            sanitize_style_attribute(value).map(Cow::Owned)
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder
}

/// Filter a `style` attribute down to its safe declarations. `style` survives
/// sanitisation (KaTeX positions glyphs with it), so each declaration is
/// vetted individually.
fn sanitize_style_attribute(value: &str) -> Option<String> {
    let mut sanitized = Vec::new();

    for declaration in value.split(';') {
        let decl = declaration.trim();
        if decl.is_empty() {
            continue;
        }
        if is_safe_style_declaration(decl) {
            sanitized.push(decl);
        }
    }

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized.join("; "))
    }
}

fn is_safe_style_declaration(decl: &str) -> bool {
    let lower = decl.to_ascii_lowercase();

    const FORBIDDEN_SUBSTRINGS: [&str; 6] = [
        "expression(",
        "javascript:",
        "vbscript:",
        "-moz-binding",
        "behavior:",
        "behaviour:",
    ];

    if FORBIDDEN_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return false;
    }

    if lower.contains("@import") {
        return false;
    }

    !contains_unsafe_url(&lower)
}

fn contains_unsafe_url(lower_decl: &str) -> bool {
    let mut offset = 0;

    while let Some(start) = lower_decl[offset..].find("url(") {
        let open = offset + start + 4;
        let rest = &lower_decl[open..];
        if let Some(close_rel) = rest.find(')') {
            let close = open + close_rel;
            let target = &lower_decl[open..close];
            let trimmed = target.trim_matches(|c: char| c.is_whitespace() || c == '\'');
            let trimmed = trimmed.trim_matches('"');

            if is_unsafe_url(trimmed) {
                return true;
            }

            offset = close + 1;
        } else {
            // malformed url, treat as unsafe
            return true;
        }
    }

    false
}

fn is_unsafe_url(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return false;
    }

    url.starts_with("javascript:")
        || url.starts_with("vbscript:")
        || url.starts_with("data:")
        || url.starts_with("file:")
        || url.contains("javascript:")
        || url.contains("vbscript:")
}
