//! In-place text replacement over a rendered PDF
//!
//! A document is decoded into page geometry and text fragments. Each fragment
//! is projected into an editable overlay aligned with the rendered glyphs, and
//! edited fragments are baked back into the document on export: a cover
//! rectangle hides the original run and the new text is drawn on top.
//!
//! Decoding and mutation go through the [`DocumentDecoder`] and
//! [`DocumentMutator`] traits. The [`lopdf_backend`] module implements both
//! with `lopdf`.

pub mod backend;
pub mod color;
pub mod config;
pub mod coords;
pub mod error;
pub mod export;
pub mod fonts;
pub mod fragment;
pub mod loader;
pub mod logging;
pub mod lopdf_backend;
pub mod overlay;
pub mod registry;
pub mod session;

pub use backend::{DocumentDecoder, DocumentMutator, RectSpec, RenderedPage, TextItem, TextSpec};
pub use color::Rgb;
pub use config::{EditorConfig, ExportConfig, FontPolicy, LoggingConfig, RenderConfig};
pub use coords::{Matrix, PageBox, RenderScale};
pub use error::{BackendError, EditorError};
pub use export::{DrawCommand, ExportArtifact};
pub use fonts::StandardFont;
pub use fragment::{FragmentId, TextFragment};
pub use loader::{LoadTicket, PageLayout};
pub use lopdf_backend::{LopdfDecoder, LopdfMutator};
pub use overlay::{EditKey, OverlayElement};
pub use registry::FragmentRegistry;
pub use session::{EditSession, LoadOutcome, SessionState};
