use katex::{OptsBuilder, OutputType};
use tracing::warn;

use crate::escape::escape_text;
use crate::render::session::{MathPlaceholder, RenderSession, SENTINEL};
use crate::render::types::RenderError;

/// Substitute every math placeholder in `html` with rendered KaTeX markup, or
/// with an escaped fallback when the expression does not render.
///
/// After this pass no placeholder id survives; the sanitizer never sees one.
pub(crate) fn restore_math(html: String, session: &RenderSession<'_>) -> Result<String, RenderError> {
    let mut html = html;
    for placeholder in session.math_placeholders() {
        if !html.contains(&placeholder.id) {
            continue;
        }
        let fragment = render_placeholder(placeholder)?;
        if placeholder.display_mode {
            // A display expression that stood alone in the source ends up as
            // its own paragraph; swap the whole paragraph for the block
            // container so a <div> never nests inside a <p>.
            let paragraph = format!("<p>{}</p>", placeholder.id);
            if html.contains(&paragraph) {
                html = html.replace(&paragraph, &fragment);
            }
        }
        html = html.replace(&placeholder.id, &fragment);
    }
    if html.contains(SENTINEL) {
        html = html.replace(SENTINEL, "");
    }
    Ok(html)
}

fn render_placeholder(placeholder: &MathPlaceholder) -> Result<String, RenderError> {
    let opts = OptsBuilder::default()
        .display_mode(placeholder.display_mode)
        .output_type(OutputType::HtmlAndMathml)
        .build()
        .map_err(|err| RenderError::MathEngine {
            message: format!("failed to build KaTeX options: {err}"),
        })?;

    match katex::render_with_opts(&placeholder.expression, opts) {
        Ok(markup) => Ok(wrap_rendered(&markup, placeholder.display_mode)),
        Err(err) => {
            warn!(
                target = "noteleaf::render::math",
                display_mode = placeholder.display_mode,
                "KaTeX rendering failed: {err}"
            );
            Ok(fallback(&placeholder.expression, placeholder.display_mode))
        }
    }
}

fn wrap_rendered(markup: &str, display_mode: bool) -> String {
    if display_mode {
        format!("<div class=\"math-block\" data-math-style=\"display\">{markup}</div>")
    } else {
        format!("<span class=\"math-inline\" data-math-style=\"inline\">{markup}</span>")
    }
}

/// Escaped, visibly-marked stand-in for an expression KaTeX rejected. The
/// raw source is shown in its original delimiters so the author can fix it.
fn fallback(expression: &str, display_mode: bool) -> String {
    if display_mode {
        let escaped = escape_text(&format!("$${expression}$$"));
        format!("<pre class=\"math-error\" data-math-style=\"display\"><code>{escaped}</code></pre>")
    } else {
        let escaped = escape_text(&format!("${expression}$"));
        format!("<code class=\"math-error\" data-math-style=\"inline\">{escaped}</code>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::session::RenderSession;

    #[test]
    fn restores_inline_math_to_katex_markup() {
        let mut session = RenderSession::new(None);
        let id = session.register_math("x^2".into(), false);
        let html = format!("<p>{id}</p>");
        let restored = restore_math(html, &session).expect("render");
        assert!(restored.contains("class=\"katex"));
        assert!(restored.contains("data-math-style=\"inline\""));
        assert!(!restored.contains(SENTINEL));
    }

    #[test]
    fn block_math_replaces_its_paragraph() {
        let mut session = RenderSession::new(None);
        let id = session.register_math("\\sum_i x_i".into(), true);
        let html = format!("<p>{id}</p>");
        let restored = restore_math(html, &session).expect("render");
        assert!(!restored.contains("<p><div"));
        assert!(restored.contains("data-math-style=\"display\""));
    }

    #[test]
    fn invalid_expression_degrades_to_escaped_fallback() {
        let mut session = RenderSession::new(None);
        let id = session.register_math("\\frac{".into(), false);
        let html = format!("<p>{id}</p>");
        let restored = restore_math(html, &session).expect("fallback, not error");
        assert!(restored.contains("math-error"));
        assert!(restored.contains("\\frac{"));
    }
}
