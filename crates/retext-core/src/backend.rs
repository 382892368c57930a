//! Contracts for the external document decoder and mutator
//!
//! The editor core never parses or writes PDF bytes itself. Decoding (page
//! geometry, rasterisation, text extraction) and mutation (cover rectangles,
//! text drawing, serialisation) are delegated to implementations of these
//! traits. Both are asynchronous and single-threaded: futures are not required
//! to be `Send`.
#![allow(async_fn_in_trait)]

use crate::color::Rgb;
use crate::coords::{Matrix, PageBox};
use crate::error::BackendError;
use crate::fonts::StandardFont;

/// A rasterised page, RGBA8, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Result of rendering one page at a given scale
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// `None` when the decoder only provides geometry
    pub raster: Option<RasterImage>,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Document space -> render space transform for this page
    pub viewport_transform: Matrix,
}

/// A glyph run as reported by the decoder
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    /// Text rendering matrix in document space; its translation is the baseline origin
    pub transform: Matrix,
    /// Advance width of the run in document units
    pub width: f64,
    pub font_name: Option<String>,
}

/// Decodes document bytes into pages, rasters and text runs
pub trait DocumentDecoder {
    type Document;
    type Page;

    async fn decode(&self, bytes: &[u8]) -> Result<Self::Document, BackendError>;

    fn page_count(&self, document: &Self::Document) -> u32;

    /// Fetch a page by 1-based number
    async fn get_page(
        &self,
        document: &Self::Document,
        page_number: u32,
    ) -> Result<Self::Page, BackendError>;

    async fn render(&self, page: &Self::Page, scale: f64) -> Result<RenderedPage, BackendError>;

    async fn text_fragments(&self, page: &Self::Page) -> Result<Vec<TextItem>, BackendError>;
}

/// Filled rectangle in document space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: Rgb,
}

/// Text placement in document space; `y` is the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec<F> {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub font: F,
    pub color: Rgb,
}

/// Loads a document, paints over it and serialises the result
pub trait DocumentMutator {
    type Document;
    type Font: Clone;

    async fn load(&self, bytes: &[u8]) -> Result<Self::Document, BackendError>;

    /// Document-space box of every page, in page order. Its top edge is the
    /// flip line for converting render positions back.
    fn page_boxes(&self, document: &Self::Document) -> Vec<PageBox>;

    async fn embed_standard_font(
        &self,
        document: &mut Self::Document,
        font: StandardFont,
    ) -> Result<Self::Font, BackendError>;

    /// Paint a rectangle on a 1-based page
    fn draw_rectangle(
        &self,
        document: &mut Self::Document,
        page: u32,
        rect: &RectSpec,
    ) -> Result<(), BackendError>;

    /// Draw a line of text on a 1-based page
    fn draw_text(
        &self,
        document: &mut Self::Document,
        page: u32,
        text: &str,
        spec: &TextSpec<Self::Font>,
    ) -> Result<(), BackendError>;

    async fn save(&self, document: Self::Document) -> Result<Vec<u8>, BackendError>;
}
