//! Decode pipeline: pages -> text runs -> registry
//!
//! Loading is all-or-nothing. Fragments are registered into a fresh registry
//! owned by the pipeline and only handed out once every page decoded, so a
//! failure on page N never leaves fragments from pages 1..N behind.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::backend::{DocumentDecoder, RasterImage};
use crate::coords::{to_render_space, RenderScale};
use crate::error::EditorError;
use crate::fragment::{FragmentId, TextFragment};
use crate::registry::FragmentRegistry;

/// Geometry of one rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// 1-based page number
    pub page: u32,
    pub render_scale: RenderScale,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub raster: Option<RasterImage>,
}

/// Handle for one upload attempt, tagged with its load generation
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    bytes: Arc<[u8]>,
}

impl LoadTicket {
    pub(crate) fn new(generation: u64, bytes: Arc<[u8]>) -> Self {
        Self { generation, bytes }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

/// Everything produced by a successful decode
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub generation: u64,
    pub pages: Vec<PageLayout>,
    pub registry: FragmentRegistry,
}

/// Decode every page of the ticket's document.
///
/// Blank and whitespace-only runs are skipped; they still consume an ordinal
/// so ids follow the decoder's item order.
#[instrument(skip_all, fields(generation = ticket.generation(), bytes = ticket.bytes().len()))]
pub async fn decode_document<D: DocumentDecoder>(
    decoder: &D,
    ticket: &LoadTicket,
    scale: RenderScale,
) -> Result<DecodedDocument, EditorError> {
    let document = decoder
        .decode(ticket.bytes())
        .await
        .map_err(|e| EditorError::DecodeFailure(e.to_string()))?;

    let page_count = decoder.page_count(&document);
    let mut pages = Vec::with_capacity(page_count as usize);
    let mut registry = FragmentRegistry::new();

    for page_number in 1..=page_count {
        let page = decoder
            .get_page(&document, page_number)
            .await
            .map_err(|e| page_failure(page_number, e))?;

        let rendered = decoder
            .render(&page, scale.get())
            .await
            .map_err(|e| page_failure(page_number, e))?;

        let items = decoder
            .text_fragments(&page)
            .await
            .map_err(|e| page_failure(page_number, e))?;

        let mut registered = 0usize;
        for (ordinal, item) in items.into_iter().enumerate() {
            if item.text.trim().is_empty() {
                continue;
            }

            let placement = to_render_space(&item.transform, &rendered.viewport_transform);
            let id = FragmentId::new(ticket.generation(), page_number, ordinal as u32);
            registry.register(TextFragment::new(
                id,
                item.text,
                placement,
                item.width * scale.get(),
                item.font_name,
                item.transform,
            ))?;
            registered += 1;
        }

        debug!(page = page_number, fragments = registered, "Decoded page");

        pages.push(PageLayout {
            page: page_number,
            render_scale: scale,
            viewport_width: rendered.viewport_width,
            viewport_height: rendered.viewport_height,
            raster: rendered.raster,
        });
    }

    info!(
        pages = pages.len(),
        fragments = registry.len(),
        "Document decoded"
    );

    Ok(DecodedDocument {
        generation: ticket.generation(),
        pages,
        registry,
    })
}

fn page_failure(page: u32, e: impl std::fmt::Display) -> EditorError {
    EditorError::DecodeFailure(format!("page {}: {}", page, e))
}
