//! Obsidian-flavored markdown rendering for untrusted shared notes.
//!
//! This crate is the rendering core of a note publishing service: callers
//! hand it raw, user-authored markdown (plus an optional share context for
//! asset and embed resolution) and get back sanitized HTML plus derived
//! metadata. The dialect is CommonMark + GFM extended with highlights
//! (`==text==`), wikilinks (`[[note]]`), tags (`#project/urgent`), embeds
//! (`![[image.png]]`), callouts (`> [!warning]`), custom task statuses
//! (`- [/]`), `$`-delimited KaTeX math and Mermaid code fences.
//!
//! Output passes through an allowlist sanitizer last, so it is safe to
//! inject into a DOM without further escaping even though documents are
//! assumed adversarial. Malformed dialect syntax never errors; it degrades
//! to literal text or an inert element.
//!
//! ```
//! use noteleaf::{RenderContext, render_markdown};
//!
//! let context = RenderContext::for_slug("trip-notes");
//! let html = render_markdown("> [!tip] Pack light\n> One bag.", Some(&context)).unwrap();
//! assert!(html.contains("callout-tip"));
//! ```

pub mod escape;
mod metadata;
pub mod render;

use tracing::error;

pub use metadata::{estimate_reading_time, extract_description, extract_title};
pub use render::{
    ComrakRenderService, FolderItem, FolderItemKind, RenderContext, RenderError, RenderOutput,
    RenderService, render_service,
};

/// Render a markdown document to sanitized HTML.
pub fn render_markdown(
    markdown: &str,
    context: Option<&RenderContext>,
) -> Result<String, RenderError> {
    render_service()
        .render(markdown, context)
        .map(|output| output.html)
}

/// Render a markdown document, substituting a safe placeholder if the
/// pipeline itself fails.
///
/// Only environment and programming errors reach that path (adversarial
/// input degrades inside the pipeline); the error is logged once here and
/// the viewer sees a generic failure note instead of a stack trace.
pub fn render_markdown_lossy(markdown: &str, context: Option<&RenderContext>) -> String {
    match render_markdown(markdown, context) {
        Ok(html) => html,
        Err(err) => {
            error!(
                target = "noteleaf::render",
                "document render failed: {err}"
            );
            "<div class=\"render-failure\">Failed to render this document.</div>".to_string()
        }
    }
}
