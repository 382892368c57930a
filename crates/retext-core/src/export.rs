//! Re-emission of edited fragments
//!
//! Every dirty fragment becomes a cover rectangle over the original glyph run,
//! followed by the replacement text drawn at the run's baseline. A fragment
//! edited to blank text only gets the rectangle: the edit erases the run.

use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::backend::{DocumentMutator, RectSpec, TextSpec};
use crate::color::Rgb;
use crate::config::{ExportConfig, FontPolicy};
use crate::coords::{to_document_space, PageBox, RenderScale};
use crate::error::EditorError;
use crate::fonts::StandardFont;
use crate::fragment::{FragmentId, TextFragment};
use crate::registry::FragmentRegistry;

/// The exported document, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}

/// One mutator call, in document space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    CoverRect {
        fragment: FragmentId,
        page: u32,
        rect: RectSpec,
    },
    Text {
        fragment: FragmentId,
        page: u32,
        text: String,
        x: f64,
        /// Baseline
        y: f64,
        size: f64,
        font: StandardFont,
        color: Rgb,
    },
}

impl DrawCommand {
    pub fn page(&self) -> u32 {
        match self {
            DrawCommand::CoverRect { page, .. } => *page,
            DrawCommand::Text { page, .. } => *page,
        }
    }

    pub fn fragment(&self) -> FragmentId {
        match self {
            DrawCommand::CoverRect { fragment, .. } => *fragment,
            DrawCommand::Text { fragment, .. } => *fragment,
        }
    }
}

/// Distance in points beyond which a replacement counts as misplaced
const ANCHOR_TOLERANCE: f64 = 0.5;

/// Build the draw commands for every dirty fragment.
///
/// `pages` are the mutator's document-space page boxes, in page order.
pub fn plan_export(
    registry: &FragmentRegistry,
    pages: &[PageBox],
    scale: RenderScale,
    config: &ExportConfig,
) -> Result<Vec<DrawCommand>, EditorError> {
    let mut commands = Vec::new();
    for fragment in registry.iter_dirty() {
        let page = (fragment.page() as usize)
            .checked_sub(1)
            .and_then(|index| pages.get(index))
            .copied()
            .ok_or_else(|| {
                EditorError::ExportFailure(format!(
                    "fragment {} refers to page {} but the document has {} pages",
                    fragment.id(),
                    fragment.page(),
                    pages.len()
                ))
            })?;
        plan_fragment(fragment, &page, scale, config, &mut commands);
    }
    Ok(commands)
}

fn plan_fragment(
    fragment: &TextFragment,
    page: &PageBox,
    scale: RenderScale,
    config: &ExportConfig,
    commands: &mut Vec<DrawCommand>,
) {
    let placed = to_document_space(
        fragment.render_position(),
        fragment.font_size_render(),
        scale,
        page,
    );
    let baseline = placed.baseline();

    // Rotated or skewed runs do not survive the axis-aligned back-conversion
    let anchor = fragment.document_transform();
    let drift = (placed.x - anchor.e).hypot(baseline - anchor.f);
    if drift > ANCHOR_TOLERANCE {
        warn!(
            fragment = %fragment.id(),
            drift,
            "Replacement is not anchored at the original run's origin"
        );
    }
    let padding = config.cover_padding;

    commands.push(DrawCommand::CoverRect {
        fragment: fragment.id(),
        page: fragment.page(),
        rect: RectSpec {
            x: placed.x - padding,
            y: baseline - padding,
            width: fragment.render_width() / scale.get() + 2.0 * padding,
            height: placed.font_size + 2.0 * padding,
            color: config.cover_color,
        },
    });

    if fragment.is_erased() {
        return;
    }

    let font = match config.font_policy {
        FontPolicy::Fixed => config.substitute_font,
        FontPolicy::ClosestStandard => StandardFont::closest_to(fragment.font_family()),
    };

    commands.push(DrawCommand::Text {
        fragment: fragment.id(),
        page: fragment.page(),
        text: fragment.current_text().to_string(),
        x: placed.x,
        y: baseline,
        size: placed.font_size,
        font,
        color: config.text_color,
    });
}

/// Replay draw commands through a mutator, embedding each font once
pub async fn apply_plan<M: DocumentMutator>(
    mutator: &M,
    document: &mut M::Document,
    commands: &[DrawCommand],
) -> Result<(), EditorError> {
    let mut fonts: HashMap<StandardFont, M::Font> = HashMap::new();

    for command in commands {
        match command {
            DrawCommand::CoverRect { page, rect, .. } => {
                mutator
                    .draw_rectangle(document, *page, rect)
                    .map_err(export_failure)?;
            }
            DrawCommand::Text {
                page,
                text,
                x,
                y,
                size,
                font,
                color,
                ..
            } => {
                let handle = match fonts.get(font) {
                    Some(handle) => handle.clone(),
                    None => {
                        let handle = mutator
                            .embed_standard_font(document, *font)
                            .await
                            .map_err(export_failure)?;
                        fonts.insert(*font, handle.clone());
                        handle
                    }
                };
                let spec = TextSpec {
                    x: *x,
                    y: *y,
                    size: *size,
                    font: handle,
                    color: *color,
                };
                mutator
                    .draw_text(document, *page, text, &spec)
                    .map_err(export_failure)?;
            }
        }
    }
    Ok(())
}

/// Apply every edit in the registry to the original document bytes.
///
/// With no dirty fragments the original bytes are returned unchanged and the
/// mutator is never called.
#[instrument(skip_all, fields(bytes = original.len()))]
pub async fn export_document<M: DocumentMutator>(
    mutator: &M,
    original: &[u8],
    registry: &FragmentRegistry,
    scale: RenderScale,
    config: &ExportConfig,
) -> Result<Vec<u8>, EditorError> {
    let dirty = registry.dirty_count();
    if dirty == 0 {
        debug!("No edits, returning original document");
        return Ok(original.to_vec());
    }

    let mut document = mutator.load(original).await.map_err(export_failure)?;
    let pages = mutator.page_boxes(&document);
    let commands = plan_export(registry, &pages, scale, config)?;

    apply_plan(mutator, &mut document, &commands).await?;

    let bytes = mutator.save(document).await.map_err(export_failure)?;
    info!(
        edits = dirty,
        commands = commands.len(),
        output_bytes = bytes.len(),
        "Document exported"
    );
    Ok(bytes)
}

fn export_failure(e: impl std::fmt::Display) -> EditorError {
    EditorError::ExportFailure(e.to_string())
}
