//! Edit session state machine
//!
//! ```text
//! Empty --upload--> Loading --decoded--> Ready --export--> Exporting --> Ready
//!                      |                   ^
//!                      +----failed---> Error
//! ```
//! A new upload from any state discards the current document and re-enters
//! `Loading`. Every upload bumps the load generation; a decode result tagged
//! with an older generation is discarded when it arrives.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{DocumentDecoder, DocumentMutator};
use crate::config::EditorConfig;
use crate::coords::RenderScale;
use crate::error::EditorError;
use crate::export::{export_document, ExportArtifact};
use crate::fragment::FragmentId;
use crate::loader::{decode_document, DecodedDocument, LoadTicket, PageLayout};
use crate::overlay::{project_all, ActiveEdit, EditKey, FinishedEdit, InlineEditor, OverlayElement};
use crate::registry::FragmentRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Empty,
    Loading,
    Ready,
    Exporting,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "empty",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Exporting => "exporting",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// What happened to a decode result handed to [`EditSession::complete_load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer upload started; the result was dropped
    Superseded,
}

struct LoadedDocument {
    bytes: Arc<[u8]>,
    pages: Vec<PageLayout>,
    registry: FragmentRegistry,
}

/// One user's editing session over one uploaded document at a time
pub struct EditSession {
    config: EditorConfig,
    scale: RenderScale,
    state: SessionState,
    generation: u64,
    pending: Option<Arc<[u8]>>,
    document: Option<LoadedDocument>,
    editor: InlineEditor,
    last_error: Option<String>,
}

impl EditSession {
    /// Create an empty session.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if the render scale is not a positive number.
    pub fn new(config: EditorConfig) -> Result<Self, EditorError> {
        config.validate()?;
        let scale = config.render_scale()?;
        Ok(Self {
            config,
            scale,
            state: SessionState::Empty,
            generation: 0,
            pending: None,
            document: None,
            editor: InlineEditor::new(),
            last_error: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn render_scale(&self) -> RenderScale {
        self.scale
    }

    /// Message of the last decode or export failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ============ Loading ============

    /// Start a new upload, discarding whatever the session held.
    pub fn begin_upload(&mut self, bytes: impl Into<Arc<[u8]>>) -> LoadTicket {
        let bytes = bytes.into();
        self.generation += 1;
        self.state = SessionState::Loading;
        self.document = None;
        self.editor.reset();
        self.last_error = None;
        self.pending = Some(Arc::clone(&bytes));

        info!(
            generation = self.generation,
            bytes = bytes.len(),
            "Upload started"
        );
        LoadTicket::new(self.generation, bytes)
    }

    /// Apply the result of decoding `ticket`'s document.
    ///
    /// Results for a superseded upload are dropped without touching the
    /// session. A failed decode leaves no residual document.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<DecodedDocument, EditorError>,
    ) -> Result<LoadOutcome, EditorError> {
        if ticket.generation() != self.generation {
            debug!(
                stale = ticket.generation(),
                current = self.generation,
                "Discarding superseded decode result"
            );
            return Ok(LoadOutcome::Superseded);
        }

        self.pending = None;
        match result {
            Ok(decoded) => {
                info!(
                    generation = self.generation,
                    pages = decoded.pages.len(),
                    fragments = decoded.registry.len(),
                    "Document ready"
                );
                self.document = Some(LoadedDocument {
                    bytes: ticket.shared_bytes(),
                    pages: decoded.pages,
                    registry: decoded.registry,
                });
                self.state = SessionState::Ready;
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                warn!(generation = self.generation, error = %e, "Document failed to load");
                self.document = None;
                self.state = SessionState::Error;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Upload and decode a document in one step
    pub async fn upload<D: DocumentDecoder>(
        &mut self,
        decoder: &D,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<(), EditorError> {
        let ticket = self.begin_upload(bytes);
        let result = decode_document(decoder, &ticket, self.scale).await;
        self.complete_load(ticket, result).map(|_| ())
    }

    // ============ Document access ============

    pub fn page_layouts(&self) -> &[PageLayout] {
        self.document
            .as_ref()
            .map(|d| d.pages.as_slice())
            .unwrap_or_default()
    }

    pub fn registry(&self) -> Option<&FragmentRegistry> {
        self.document.as_ref().map(|d| &d.registry)
    }

    /// Original bytes of the loaded document, or of the upload in flight
    pub fn document_bytes(&self) -> Option<&[u8]> {
        self.document
            .as_ref()
            .map(|d| &*d.bytes)
            .or(self.pending.as_deref())
    }

    pub fn dirty_count(&self) -> usize {
        self.registry().map_or(0, FragmentRegistry::dirty_count)
    }

    /// Current overlay layer, recomputed from the registry
    pub fn overlay_elements(&self) -> Vec<OverlayElement> {
        match self.registry() {
            Some(registry) => project_all(
                registry,
                self.config.render.glyph_aspect,
                self.editor.active().map(|edit| edit.id),
            ),
            None => Vec::new(),
        }
    }

    // ============ Editing ============

    /// Set a fragment's text directly.
    ///
    /// Returns `false` when nothing was committed: the session is not ready or
    /// the id does not belong to the loaded document.
    pub fn commit_edit(&mut self, id: FragmentId, text: impl Into<String>) -> bool {
        if self.state != SessionState::Ready {
            return false;
        }
        match self.document.as_mut() {
            Some(document) => document.registry.commit_edit(id, text),
            None => false,
        }
    }

    /// Double-activation on an overlay element: open its inline editor.
    ///
    /// Returns `true` when an editor is open for `id` afterwards.
    pub fn activate(&mut self, id: FragmentId) -> bool {
        if self.state != SessionState::Ready {
            return false;
        }
        let Some(current) = self
            .registry()
            .and_then(|r| r.get(id))
            .map(|f| f.current_text().to_string())
        else {
            return false;
        };

        if let Some(finished) = self.editor.activate(id, &current) {
            self.apply_finished(finished);
        }
        true
    }

    pub fn editing(&self) -> Option<&ActiveEdit> {
        self.editor.active()
    }

    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.editor.update_draft(text);
    }

    pub fn handle_key(&mut self, key: EditKey) {
        if let Some(finished) = self.editor.handle_key(key) {
            self.apply_finished(finished);
        }
    }

    pub fn blur(&mut self) {
        if let Some(finished) = self.editor.blur() {
            self.apply_finished(finished);
        }
    }

    fn apply_finished(&mut self, finished: FinishedEdit) {
        self.commit_edit(finished.id, finished.text);
    }

    // ============ Export ============

    /// Bake all edits into a new document.
    ///
    /// Fails fast with `NotReady` unless the session is `Ready`. Whatever the
    /// outcome, the session returns to `Ready` with its registry intact, so a
    /// failed export can be retried.
    pub async fn export<M: DocumentMutator>(
        &mut self,
        mutator: &M,
    ) -> Result<ExportArtifact, EditorError> {
        if self.state != SessionState::Ready {
            return Err(EditorError::NotReady(self.state));
        }
        // An open editor loses focus when export is triggered
        self.blur();

        let Some(document) = self.document.as_ref() else {
            return Err(EditorError::NotReady(self.state));
        };

        self.state = SessionState::Exporting;
        let result = export_document(
            mutator,
            &document.bytes,
            &document.registry,
            self.scale,
            &self.config.export,
        )
        .await;
        self.state = SessionState::Ready;

        match result {
            Ok(bytes) => {
                self.last_error = None;
                Ok(ExportArtifact {
                    file_name: self.config.export.file_name.clone(),
                    bytes,
                })
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl fmt::Debug for EditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("fragments", &self.registry().map_or(0, FragmentRegistry::len))
            .finish_non_exhaustive()
    }
}
