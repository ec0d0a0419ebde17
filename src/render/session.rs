//! Per-render state.
//!
//! A [`RenderSession`] is created fresh for every render call, owned
//! exclusively by that call, and threaded by reference through the pipeline.
//! Nothing in this module (or anywhere else in the crate) keeps mutable state
//! across calls, so concurrent renders cannot observe each other's math
//! placeholders or embed context.

use crate::render::types::{FolderItem, RenderContext};

/// Control character embedded in placeholder ids. The raw input is scrubbed
/// of this character before any processing, so no document can forge an id.
pub(crate) const SENTINEL: char = '\u{1A}';

/// A math expression lifted out of the source text before parsing, keyed by
/// an opaque id that stands in for it until restoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MathPlaceholder {
    pub(crate) id: String,
    pub(crate) expression: String,
    pub(crate) display_mode: bool,
}

pub(crate) struct RenderSession<'a> {
    context: Option<&'a RenderContext>,
    math: Vec<MathPlaceholder>,
}

impl<'a> RenderSession<'a> {
    pub(crate) fn new(context: Option<&'a RenderContext>) -> Self {
        Self {
            context,
            math: Vec::new(),
        }
    }

    pub(crate) fn slug(&self) -> Option<&str> {
        self.context.and_then(|ctx| ctx.slug.as_deref())
    }

    pub(crate) fn folder_items(&self) -> &[FolderItem] {
        self.context.map_or(&[], |ctx| ctx.folder_items.as_slice())
    }

    /// Mint a placeholder id for `expression` and record it for restoration.
    pub(crate) fn register_math(&mut self, expression: String, display_mode: bool) -> String {
        let id = format!("{SENTINEL}m{}{SENTINEL}", self.math.len());
        self.math.push(MathPlaceholder {
            id: id.clone(),
            expression,
            display_mode,
        });
        id
    }

    pub(crate) fn math_placeholders(&self) -> &[MathPlaceholder] {
        &self.math
    }
}
