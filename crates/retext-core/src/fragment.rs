//! Text fragments discovered while decoding a document

use serde::Serialize;
use std::fmt;

use crate::coords::{Matrix, RenderPlacement, RenderPoint};

/// Font family used for overlay text when the decoder reports none
pub const FALLBACK_FONT_FAMILY: &str = "sans-serif";

/// Stable identifier of a fragment within one loaded document.
///
/// `generation` is the session load generation, so an id from a superseded
/// document never matches a fragment of the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FragmentId {
    pub generation: u64,
    /// 1-based page number
    pub page: u32,
    /// Index of the glyph run within the page's decoded items
    pub ordinal: u32,
}

impl FragmentId {
    pub fn new(generation: u64, page: u32, ordinal: u32) -> Self {
        Self {
            generation,
            page,
            ordinal,
        }
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}:p{}:t{}", self.generation, self.page, self.ordinal)
    }
}

/// One editable glyph run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFragment {
    id: FragmentId,
    original_text: String,
    current_text: String,
    render_position: RenderPoint,
    font_size_render: f64,
    font_family: String,
    render_width: f64,
    document_transform: Matrix,
}

impl TextFragment {
    pub fn new(
        id: FragmentId,
        text: impl Into<String>,
        placement: RenderPlacement,
        render_width: f64,
        font_family: Option<String>,
        document_transform: Matrix,
    ) -> Self {
        let original_text = text.into();
        Self {
            id,
            current_text: original_text.clone(),
            original_text,
            render_position: placement.position,
            font_size_render: placement.font_size,
            font_family: font_family
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_FONT_FAMILY.to_string()),
            render_width,
            document_transform,
        }
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.id.page
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn render_position(&self) -> RenderPoint {
        self.render_position
    }

    pub fn font_size_render(&self) -> f64 {
        self.font_size_render
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn render_width(&self) -> f64 {
        self.render_width
    }

    pub fn document_transform(&self) -> &Matrix {
        &self.document_transform
    }

    /// True when the current text differs from the decoded text
    pub fn is_dirty(&self) -> bool {
        self.current_text != self.original_text
    }

    /// True when the edit erases the run instead of replacing it
    pub fn is_erased(&self) -> bool {
        self.current_text.trim().is_empty()
    }

    pub(crate) fn set_current_text(&mut self, text: String) {
        self.current_text = text;
    }
}
