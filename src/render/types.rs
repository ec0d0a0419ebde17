use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of entry in a shared folder listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderItemKind {
    Doc,
    Folder,
    Canvas,
}

/// One entry of the folder listing that accompanies a folder share. Used only
/// to resolve `![[...]]` note embeds against the documents that actually exist
/// in the share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderItem {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FolderItemKind,
    /// Raw markdown of the entry, when the caller has it loaded. Not consumed
    /// by the renderer today (note embeds render as cards, not transclusions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FolderItem {
    pub fn doc(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: FolderItemKind::Doc,
            content: None,
        }
    }
}

/// Per-document context supplied by the web layer. Everything here is scoped
/// to one render call; the pipeline never stores it beyond the call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderContext {
    /// Share slug used to build asset URLs for image embeds.
    #[serde(default)]
    pub slug: Option<String>,
    /// Folder listing used to resolve note embeds.
    #[serde(default)]
    pub folder_items: Vec<FolderItem>,
}

impl RenderContext {
    pub fn for_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            folder_items: Vec::new(),
        }
    }

    pub fn with_folder_items(mut self, folder_items: Vec<FolderItem>) -> Self {
        self.folder_items = folder_items;
        self
    }
}

/// Deterministic rendering result returned to callers.
///
/// The capability flags let the web layer load KaTeX CSS and the Mermaid
/// bootstrap only for documents that need them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Sanitised HTML, safe to inject into a DOM without further escaping.
    pub html: String,
    pub contains_code: bool,
    pub contains_math: bool,
    pub contains_mermaid: bool,
}

/// Structured errors surfaced by the rendering pipeline.
///
/// Malformed or adversarial *input* never produces one of these: the dialect
/// degrades to literal text and math failures degrade to per-expression
/// fallbacks. Only environment and programming errors surface here.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed for `{language}`: {message}")]
    Highlighting { language: String, message: String },
    #[error("math engine unavailable: {message}")]
    MathEngine { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input and context, they return identical
/// output or the same error.
pub trait RenderService: Send + Sync {
    fn render(
        &self,
        markdown: &str,
        context: Option<&RenderContext>,
    ) -> Result<RenderOutput, RenderError>;
}
