//! Overlay text layer
//!
//! Overlay elements are a projection of registry state: they are recomputed
//! from fragments on demand and never read back. The inline editor models the
//! double-activate / type / commit / cancel cycle of a single element as a
//! state machine with no dependency on any input-focus mechanism.

use serde::Serialize;

use crate::coords::horizontal_scale_factor;
use crate::fragment::{FragmentId, TextFragment};
use crate::registry::FragmentRegistry;

/// Placement and content of one overlay element, in render space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayElement {
    pub id: FragmentId,
    pub page: u32,
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub font_size: f64,
    pub font_family: String,
    /// Horizontal stretch, anchored at the left edge
    pub scale_x: f64,
    /// Hidden while its inline editor is open
    pub editing: bool,
}

/// Project a fragment into an overlay element.
///
/// The stretch is computed from the original text: the measured width
/// belongs to the original run.
pub fn project(fragment: &TextFragment, glyph_aspect: f64) -> OverlayElement {
    OverlayElement {
        id: fragment.id(),
        page: fragment.page(),
        text: fragment.current_text().to_string(),
        left: fragment.render_position().x,
        top: fragment.render_position().y,
        font_size: fragment.font_size_render(),
        font_family: fragment.font_family().to_string(),
        scale_x: horizontal_scale_factor(
            fragment.render_width(),
            fragment.original_text(),
            fragment.font_size_render(),
            glyph_aspect,
        ),
        editing: false,
    }
}

/// Project every fragment in registry order
pub fn project_all(
    registry: &FragmentRegistry,
    glyph_aspect: f64,
    editing: Option<FragmentId>,
) -> Vec<OverlayElement> {
    registry
        .iter()
        .map(|fragment| {
            let mut element = project(fragment, glyph_aspect);
            element.editing = editing == Some(element.id);
            element
        })
        .collect()
}

/// Serialize overlay elements for a JavaScript or other UI shell
pub fn to_json(elements: &[OverlayElement]) -> Result<String, serde_json::Error> {
    serde_json::to_string(elements)
}

/// Keys with a defined meaning while an inline editor is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// Enter: commit the draft
    Commit,
    /// Escape: discard the draft
    Cancel,
}

/// An open inline editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEdit {
    pub id: FragmentId,
    /// Text the editor opened with
    pub initial: String,
    pub draft: String,
}

/// What the caller should commit when an editor closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedEdit {
    pub id: FragmentId,
    pub text: String,
}

/// Inline text-entry state for the overlay
#[derive(Debug, Clone, Default)]
pub struct InlineEditor {
    active: Option<ActiveEdit>,
}

impl InlineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveEdit> {
        self.active.as_ref()
    }

    pub fn is_editing(&self, id: FragmentId) -> bool {
        self.active.as_ref().is_some_and(|edit| edit.id == id)
    }

    /// Open an editor for `id` pre-filled with `current_text`.
    ///
    /// Re-activating the element being edited does nothing. Activating another
    /// element closes the open editor as a blur would, and returns that edit.
    pub fn activate(&mut self, id: FragmentId, current_text: &str) -> Option<FinishedEdit> {
        if self.is_editing(id) {
            return None;
        }
        let finished = self.finish();
        self.active = Some(ActiveEdit {
            id,
            initial: current_text.to_string(),
            draft: current_text.to_string(),
        });
        finished
    }

    /// Replace the draft text. Ignored when no editor is open.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        if let Some(edit) = self.active.as_mut() {
            edit.draft = text.into();
        }
    }

    pub fn handle_key(&mut self, key: EditKey) -> Option<FinishedEdit> {
        match key {
            EditKey::Commit => self.finish(),
            EditKey::Cancel => {
                if let Some(edit) = self.active.as_mut() {
                    edit.draft = edit.initial.clone();
                }
                self.finish()
            }
        }
    }

    /// Focus left the editor: commit the draft
    pub fn blur(&mut self) -> Option<FinishedEdit> {
        self.finish()
    }

    /// Drop the open editor without producing an edit
    pub fn reset(&mut self) {
        self.active = None;
    }

    fn finish(&mut self) -> Option<FinishedEdit> {
        self.active.take().map(|edit| FinishedEdit {
            id: edit.id,
            text: edit.draft,
        })
    }
}
