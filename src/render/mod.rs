//! The markdown → sanitized HTML pipeline.
//!
//! The pipeline is pure and deterministic: it accepts markdown plus an
//! optional per-document context, and produces sanitized HTML. All shared
//! service state (parser options, syntax set, sanitizer allowlist) is
//! immutable after construction; everything per-render lives in a
//! [`session::RenderSession`] owned by the call, so concurrent renders never
//! interact.

mod annotate;
mod callout;
mod config;
mod highlight;
mod inline;
mod math;
mod preprocess;
mod rewrite;
mod session;
mod slug;
pub mod types;

use std::sync::Arc;

use comrak::options::Options;
use comrak::{Arena, format_html, parse_document};
use once_cell::sync::Lazy;
use syntect::html::ClassStyle;
use syntect::parsing::SyntaxSet;

use self::annotate::annotate;
use self::inline::{InlineContext, apply_inline_rules};
use self::math::restore_math;
use self::preprocess::preprocess;
use self::rewrite::apply_overrides;
use self::session::RenderSession;

pub use self::types::{
    FolderItem, FolderItemKind, RenderContext, RenderError, RenderOutput, RenderService,
};

pub(crate) use self::preprocess::{split_frontmatter, strip_comments};

/// Default Comrak-based rendering pipeline with Syntect highlighting and
/// Ammonia sanitisation.
pub struct ComrakRenderService {
    options: Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    /// Construct a new renderer with the dialect extensions registered and
    /// syntax highlighting configured to emit `syntax-` prefixed CSS classes.
    fn new() -> Self {
        Self {
            options: config::default_options(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: config::build_sanitizer(),
        }
    }

    /// Run only the allowlist pass. Sanitisation is idempotent: feeding this
    /// pipeline's own output back in returns it unchanged.
    pub fn sanitize_html(&self, html: &str) -> String {
        self.sanitizer.clean(html).to_string()
    }

    /// Render while skipping the sanitisation stage. Intended for
    /// diagnostics when refining sanitizer rules; never serve this output.
    pub fn render_unsanitized(
        &self,
        markdown: &str,
        context: Option<&RenderContext>,
    ) -> Result<String, RenderError> {
        self.render_document(markdown, context, false)
            .map(|output| output.html)
    }

    fn render_document(
        &self,
        markdown: &str,
        context: Option<&RenderContext>,
        sanitize: bool,
    ) -> Result<RenderOutput, RenderError> {
        let mut session = RenderSession::new(context);
        let cleaned = preprocess(markdown, &mut session);

        let arena = Arena::new();
        let root = parse_document(&arena, &cleaned, &self.options);

        {
            let inline_ctx = InlineContext {
                slug: session.slug(),
                folder_items: session.folder_items(),
            };
            apply_inline_rules(&arena, root, &inline_ctx);
        }

        let annotations = annotate(root);
        let outcome = apply_overrides(
            &arena,
            root,
            annotations,
            &self.options,
            &self.syntax_set,
            &self.class_style,
        )?;

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        let html = restore_math(html, &session)?;
        let html = if sanitize {
            self.sanitizer.clean(&html).to_string()
        } else {
            html
        };

        Ok(RenderOutput {
            html,
            contains_code: outcome.contains_code,
            contains_math: !session.math_placeholders().is_empty(),
            contains_mermaid: outcome.contains_mermaid,
        })
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(
        &self,
        markdown: &str,
        context: Option<&RenderContext>,
    ) -> Result<RenderOutput, RenderError> {
        self.render_document(markdown, context, true)
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}
