use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;
use tracing::{debug, trace};

use super::{inherited_attribute, media_box, number, resolve_dict};
use crate::backend::{DocumentDecoder, RenderedPage, TextItem};
use crate::coords::{Matrix, PageBox, RenderScale, DEFAULT_GLYPH_ASPECT};
use crate::error::BackendError;

/// TJ adjustments at or below this (thousandths of text space) read as a word gap
const WORD_GAP_THRESHOLD: f64 = -250.0;

/// A decoded page: geometry plus its text runs in content-stream order
#[derive(Debug, Clone, PartialEq)]
pub struct LopdfPage {
    media_box: PageBox,
    items: Vec<TextItem>,
}

impl LopdfPage {
    pub fn media_box(&self) -> &PageBox {
        &self.media_box
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LopdfDecoder {
    glyph_aspect: f64,
}

impl LopdfDecoder {
    pub fn new() -> Self {
        Self::with_glyph_aspect(DEFAULT_GLYPH_ASPECT)
    }

    /// Use `glyph_aspect` (average glyph width per unit of font size) for run widths
    pub fn with_glyph_aspect(glyph_aspect: f64) -> Self {
        Self { glyph_aspect }
    }
}

impl Default for LopdfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentDecoder for LopdfDecoder {
    type Document = Document;
    type Page = LopdfPage;

    async fn decode(&self, bytes: &[u8]) -> Result<Document, BackendError> {
        let doc = Document::load_mem(bytes)?;
        if doc.is_encrypted() {
            return Err(BackendError::new("encrypted documents are not supported"));
        }
        Ok(doc)
    }

    fn page_count(&self, document: &Document) -> u32 {
        document.get_pages().len() as u32
    }

    async fn get_page(&self, document: &Document, page_number: u32) -> Result<LopdfPage, BackendError> {
        let page_id = *document
            .get_pages()
            .get(&page_number)
            .ok_or_else(|| BackendError::new(format!("page {} does not exist", page_number)))?;

        let content = Content::decode(&document.get_page_content(page_id)?)?;
        let fonts = page_font_names(document, page_id);

        let mut interpreter = TextInterpreter::new(&fonts, self.glyph_aspect);
        for operation in &content.operations {
            interpreter.apply(operation);
        }
        let items = interpreter.finish();
        debug!(page = page_number, items = items.len(), "Extracted text runs");

        Ok(LopdfPage {
            media_box: media_box(document, page_id),
            items,
        })
    }

    async fn render(&self, page: &LopdfPage, scale: f64) -> Result<RenderedPage, BackendError> {
        let scale = RenderScale::new(scale).map_err(|e| BackendError::new(e.to_string()))?;
        Ok(RenderedPage {
            raster: None,
            viewport_width: page.media_box.width() * scale.get(),
            viewport_height: page.media_box.height() * scale.get(),
            viewport_transform: Matrix::viewport(scale, &page.media_box),
        })
    }

    async fn text_fragments(&self, page: &LopdfPage) -> Result<Vec<TextItem>, BackendError> {
        Ok(page.items.clone())
    }
}

/// Resource name -> BaseFont for every font the page can use
fn page_font_names(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, String> {
    let mut names = HashMap::new();
    let Some(fonts) = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|f| resolve_dict(doc, f))
    else {
        return names;
    };

    for (key, value) in fonts.iter() {
        let base_font = resolve_dict(doc, value)
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|name| name.as_name().ok());
        if let Some(base_font) = base_font {
            names.insert(key.clone(), strip_subset_tag(base_font));
        }
    }
    names
}

/// "ABCDEF+Times-Bold" -> "Times-Bold"
fn strip_subset_tag(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => {
            rest.to_string()
        }
        _ => name.into_owned(),
    }
}

/// Decode a PDF string operand: UTF-16BE with a BOM, otherwise one char per byte
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// Tz / 100
    horizontal_scaling: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Tracks just enough graphics and text state to place every shown string
struct TextInterpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, String>,
    glyph_aspect: f64,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    items: Vec<TextItem>,
}

impl<'a> TextInterpreter<'a> {
    fn new(fonts: &'a HashMap<Vec<u8>, String>, glyph_aspect: f64) -> Self {
        Self {
            fonts,
            glyph_aspect,
            state: GraphicsState::default(),
            saved: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            items: Vec::new(),
        }
    }

    fn finish(self) -> Vec<TextItem> {
        self.items
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number);

        match op.operator.as_str() {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.ctm = Matrix::compose(&self.state.ctm, &m);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) = (operands.first(), num(1)) {
                    self.state.text.font = Some(name.clone());
                    self.state.text.size = size;
                }
            }
            "Tc" => self.state.text.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.text.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.text.horizontal_scaling = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.text.leading = num(0).unwrap_or(0.0),
            "Ts" => self.state.text.rise = num(0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(string @ Object::String(..)) = operands.first() {
                    self.show(std::slice::from_ref(string));
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = operands.first() {
                    self.show(parts);
                }
            }
            "'" => {
                self.next_line();
                if let Some(string @ Object::String(..)) = operands.first() {
                    self.show(std::slice::from_ref(string));
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(string @ Object::String(..)) = operands.get(2) {
                    self.show(std::slice::from_ref(string));
                }
            }
            other => trace!(operator = other, "Ignoring operator"),
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::compose(&self.line_matrix, &Matrix::translate(tx, ty));
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Show a TJ-style array of strings and kerning adjustments as one run
    fn show(&mut self, parts: &[Object]) {
        let text_state = &self.state.text;
        let size = text_state.size;
        let hscale = text_state.horizontal_scaling;

        let rendering = Matrix::compose(
            &self.state.ctm,
            &Matrix::compose(
                &self.text_matrix,
                &Matrix::new(size * hscale, 0.0, 0.0, size, 0.0, text_state.rise),
            ),
        );

        let mut text = String::new();
        let mut advance = 0.0;
        for part in parts {
            match part {
                Object::String(bytes, _) => {
                    let decoded = decode_pdf_string(bytes);
                    for ch in decoded.chars() {
                        advance += size * self.glyph_aspect + text_state.char_spacing;
                        if ch == ' ' {
                            advance += text_state.word_spacing;
                        }
                    }
                    text.push_str(&decoded);
                }
                other => {
                    if let Some(adjustment) = number(other) {
                        advance -= adjustment / 1000.0 * size;
                        if adjustment <= WORD_GAP_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                    }
                }
            }
        }
        let advance = advance * hscale;

        // Text space -> document space for the advance along the baseline
        let line = Matrix::compose(&self.state.ctm, &self.text_matrix);
        let width = advance * line.a.hypot(line.b);

        self.text_matrix = Matrix::compose(&self.text_matrix, &Matrix::translate(advance, 0.0));

        if text.is_empty() {
            return;
        }
        let font_name = text_state
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .cloned();

        self.items.push(TextItem {
            text,
            transform: rendering,
            width,
            font_name,
        });
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f64> = operands.iter().filter_map(number).collect();
    match values.as_slice() {
        &[a, b, c, d, e, f] => Some(Matrix::new(a, b, c, d, e, f)),
        _ => None,
    }
}
