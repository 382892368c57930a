//! Coordinate reconciliation between document space and render space
//!
//! Document space is the PDF's own unit system: points, origin at the
//! bottom-left of the page, Y increasing upward. Render space is the pixel
//! grid of the rasterised page: origin at the top-left, Y increasing
//! downward, scaled by a fixed per-document render scale `S`.
//!
//! Text fragments are placed once going forward (decode -> overlay) and
//! converted once going back (edit -> re-emission):
//! ```text
//! render_x   = e
//! render_y   = f - font_size            (baseline -> top of glyph box)
//! doc_x      = x0 + render_x / S
//! doc_y      = y1 - render_y / S
//! ```
//! `[x0, y0, x1, y1]` is the page's MediaBox in document space, so `y1` is the
//! page height when the box starts at the origin. The viewport height is never
//! used going back.

use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Default render scale used when no configuration is supplied
pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

/// Assumed average glyph advance as a fraction of the font size.
///
/// Only used by the horizontal-scale heuristic, which treats every glyph as
/// the same width. It is not derived from real font metrics.
pub const DEFAULT_GLYPH_ASPECT: f64 = 0.5;

/// A PDF affine transform `[a b c d e f]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Compose two transforms: `inner` is applied first, then `outer`.
    pub fn compose(outer: &Matrix, inner: &Matrix) -> Matrix {
        Matrix {
            a: outer.a * inner.a + outer.c * inner.b,
            b: outer.b * inner.a + outer.d * inner.b,
            c: outer.a * inner.c + outer.c * inner.d,
            d: outer.b * inner.c + outer.d * inner.d,
            e: outer.a * inner.e + outer.c * inner.f + outer.e,
            f: outer.b * inner.e + outer.d * inner.f + outer.f,
        }
    }

    /// Apply this transform to a point
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Viewport transform for a page.
    ///
    /// Flips the Y axis and scales by `scale`, so the media box's top-left
    /// corner lands on render-space `(0, 0)`.
    pub fn viewport(scale: RenderScale, page: &PageBox) -> Matrix {
        let s = scale.get();
        Matrix::new(s, 0.0, 0.0, -s, -page.x0 * s, page.y1 * s)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

/// Validated render scale factor (`S`), always finite and positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderScale(f64);

impl RenderScale {
    pub fn new(scale: f64) -> Result<Self, EditorError> {
        if scale.is_finite() && scale > 0.0 {
            Ok(Self(scale))
        } else {
            Err(EditorError::InvalidConfiguration(format!(
                "render scale must be a positive number, got {}",
                scale
            )))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for RenderScale {
    fn default() -> Self {
        Self(DEFAULT_RENDER_SCALE)
    }
}

/// A page's MediaBox `[x0, y0, x1, y1]` in document space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// A `width` x `height` page anchored at the origin
    pub const fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// A point in render space (pixels, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderPoint {
    pub x: f64,
    pub y: f64,
}

/// Overlay placement of a glyph run in render space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderPlacement {
    /// Top-left corner of the glyph box
    pub position: RenderPoint,
    pub font_size: f64,
}

/// Placement of a glyph run in document space (points, bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentPlacement {
    pub x: f64,
    /// Top of the glyph box
    pub y: f64,
    pub font_size: f64,
}

impl DocumentPlacement {
    /// Baseline of the glyph run, where text drawing is anchored
    pub fn baseline(&self) -> f64 {
        self.y - self.font_size
    }
}

/// Map a fragment's document-space transform into render space.
///
/// The font size is the length of the composed transform's first column,
/// which is independent of rotation. The transform's translation is the
/// baseline anchor; the returned position is moved up by one font size to
/// the top-left of the glyph box. No rounding is applied.
pub fn to_render_space(document_transform: &Matrix, viewport_transform: &Matrix) -> RenderPlacement {
    let tx = Matrix::compose(viewport_transform, document_transform);
    let font_size = tx.a.hypot(tx.b);

    RenderPlacement {
        position: RenderPoint {
            x: tx.e,
            y: tx.f - font_size,
        },
        font_size,
    }
}

/// Horizontal stretch that makes an overlay run span the original run's width.
///
/// This is an approximation: it estimates the overlay's natural width as
/// `chars * font_size * glyph_aspect`, as if every glyph were the same width,
/// and returns the ratio of the measured width to that estimate.
pub fn horizontal_scale_factor(
    render_width: f64,
    text: &str,
    font_size_render: f64,
    glyph_aspect: f64,
) -> f64 {
    let chars = text.chars().count();
    let estimate = chars as f64 * font_size_render * glyph_aspect;

    debug_assert!(chars > 0, "blank text must be filtered before reconciliation");
    debug_assert!(
        font_size_render > 0.0,
        "font size must be positive, got {}",
        font_size_render
    );

    let factor = render_width / estimate;
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    }
}

/// Map a render-space placement back into document space.
///
/// Exact inverse of [`Matrix::viewport`] for the same `page`: the Y flip is
/// taken against the box's top edge and the box's left edge is added back.
/// For a box at the origin this is `y = page_height - ry / S`.
pub fn to_document_space(
    render_position: RenderPoint,
    render_font_size: f64,
    scale: RenderScale,
    page: &PageBox,
) -> DocumentPlacement {
    let s = scale.get();
    DocumentPlacement {
        x: page.x0 + render_position.x / s,
        y: page.y1 - render_position.y / s,
        font_size: render_font_size / s,
    }
}
