//! Editor configuration
//!
//! TOML-based configuration for the render scale, export styling and
//! logging. Every field has a default, so an empty document is a valid
//! configuration.
//!
//! ```toml
//! [render]
//! scale = 1.5
//!
//! [export]
//! cover_padding = 2.0
//! substitute_font = "Helvetica"
//! file_name = "edited-document.pdf"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::Rgb;
use crate::coords::{RenderScale, DEFAULT_GLYPH_ASPECT, DEFAULT_RENDER_SCALE};
use crate::error::EditorError;
use crate::fonts::StandardFont;

/// Default name of the exported artifact
pub const DEFAULT_EXPORT_FILE_NAME: &str = "edited-document.pdf";

/// Default margin around a cover rectangle, in document units
pub const DEFAULT_COVER_PADDING: f64 = 2.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EditorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed, or
    /// the values fail [`EditorConfig::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: EditorConfig = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the reconciler cannot work with
    pub fn validate(&self) -> Result<(), EditorError> {
        RenderScale::new(self.render.scale)?;

        if !(self.render.glyph_aspect.is_finite() && self.render.glyph_aspect > 0.0) {
            return Err(EditorError::InvalidConfiguration(format!(
                "glyph_aspect must be a positive number, got {}",
                self.render.glyph_aspect
            )));
        }
        if !(self.export.cover_padding.is_finite() && self.export.cover_padding >= 0.0) {
            return Err(EditorError::InvalidConfiguration(format!(
                "cover_padding must be zero or positive, got {}",
                self.export.cover_padding
            )));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(EditorError::InvalidConfiguration(
                "export file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The validated render scale
    pub fn render_scale(&self) -> Result<RenderScale, EditorError> {
        RenderScale::new(self.render.scale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render scale factor between document units and pixels (default: 1.5)
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Average glyph width as a fraction of the font size, for the
    /// horizontal-scale heuristic (default: 0.5)
    #[serde(default = "default_glyph_aspect")]
    pub glyph_aspect: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            glyph_aspect: default_glyph_aspect(),
        }
    }
}

fn default_scale() -> f64 {
    DEFAULT_RENDER_SCALE
}

fn default_glyph_aspect() -> f64 {
    DEFAULT_GLYPH_ASPECT
}

/// How replacement text picks its font
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontPolicy {
    /// Always use `substitute_font`
    #[default]
    Fixed,
    /// Use the standard font closest to the fragment's decoded font name
    ClosestStandard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Margin added on every side of a cover rectangle (default: 2.0)
    #[serde(default = "default_cover_padding")]
    pub cover_padding: f64,
    #[serde(default)]
    pub substitute_font: StandardFont,
    #[serde(default)]
    pub font_policy: FontPolicy,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_text_color")]
    pub text_color: Rgb,
    #[serde(default = "default_cover_color")]
    pub cover_color: Rgb,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            cover_padding: default_cover_padding(),
            substitute_font: StandardFont::default(),
            font_policy: FontPolicy::default(),
            file_name: default_file_name(),
            text_color: default_text_color(),
            cover_color: default_cover_color(),
        }
    }
}

fn default_cover_padding() -> f64 {
    DEFAULT_COVER_PADDING
}

fn default_file_name() -> String {
    DEFAULT_EXPORT_FILE_NAME.to_string()
}

fn default_text_color() -> Rgb {
    Rgb::BLACK
}

fn default_cover_color() -> Rgb {
    Rgb::WHITE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence (default: "info")
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}
