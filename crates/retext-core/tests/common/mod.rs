//! Scripted decoder and recording mutator for session tests

#![allow(dead_code)]

use retext_core::backend::{DocumentDecoder, DocumentMutator, RectSpec, RenderedPage, TextItem, TextSpec};
use retext_core::coords::{Matrix, PageBox, RenderScale};
use retext_core::error::BackendError;
use retext_core::fonts::StandardFont;
use std::cell::RefCell;

pub const PAGE: PageBox = PageBox::sized(1000.0, 1400.0);

/// A run of `text` at `(x, y)` in a `size`pt font, width from the 0.5 heuristic
pub fn item(text: &str, size: f64, x: f64, y: f64) -> TextItem {
    TextItem {
        text: text.to_string(),
        transform: Matrix::new(size, 0.0, 0.0, size, x, y),
        width: text.chars().count() as f64 * size * 0.5,
        font_name: Some("g_d0_f1".to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub media_box: PageBox,
    pub items: Vec<TextItem>,
}

impl FakePage {
    pub fn new(items: Vec<TextItem>) -> Self {
        Self {
            media_box: PAGE,
            items,
        }
    }
}

/// Decoder that serves fixed pages, optionally failing
#[derive(Debug, Clone, Default)]
pub struct FakeDecoder {
    pub pages: Vec<FakePage>,
    pub reject_bytes: bool,
    pub fail_on_page: Option<u32>,
}

impl FakeDecoder {
    pub fn with_pages(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn single(items: Vec<TextItem>) -> Self {
        Self::with_pages(vec![FakePage::new(items)])
    }

    pub fn corrupt() -> Self {
        Self {
            reject_bytes: true,
            ..Self::default()
        }
    }
}

impl DocumentDecoder for FakeDecoder {
    type Document = Vec<FakePage>;
    type Page = (u32, FakePage);

    async fn decode(&self, _bytes: &[u8]) -> Result<Vec<FakePage>, BackendError> {
        if self.reject_bytes {
            return Err(BackendError::new("not a PDF"));
        }
        Ok(self.pages.clone())
    }

    fn page_count(&self, document: &Vec<FakePage>) -> u32 {
        document.len() as u32
    }

    async fn get_page(&self, document: &Vec<FakePage>, page_number: u32) -> Result<(u32, FakePage), BackendError> {
        if self.fail_on_page == Some(page_number) {
            return Err(BackendError::new("broken page"));
        }
        document
            .get(page_number as usize - 1)
            .cloned()
            .map(|page| (page_number, page))
            .ok_or_else(|| BackendError::new("no such page"))
    }

    async fn render(&self, page: &(u32, FakePage), scale: f64) -> Result<RenderedPage, BackendError> {
        let scale = RenderScale::new(scale).map_err(|e| BackendError::new(e.to_string()))?;
        let media_box = &page.1.media_box;
        Ok(RenderedPage {
            raster: None,
            viewport_width: media_box.width() * scale.get(),
            viewport_height: media_box.height() * scale.get(),
            viewport_transform: Matrix::viewport(scale, media_box),
        })
    }

    async fn text_fragments(&self, page: &(u32, FakePage)) -> Result<Vec<TextItem>, BackendError> {
        Ok(page.1.items.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load,
    Embed(StandardFont),
    Rect { page: u32, rect: RectSpec },
    Text { page: u32, text: String, spec: TextSpec<StandardFont> },
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Load,
    Draw,
    Save,
}

/// Mutator that records every call and serialises to a marker document
#[derive(Debug, Default)]
pub struct RecordingMutator {
    pub page_boxes: Vec<PageBox>,
    pub fail_at: Option<FailAt>,
    calls: RefCell<Vec<Call>>,
}

impl RecordingMutator {
    pub fn new() -> Self {
        Self {
            page_boxes: vec![PAGE],
            ..Self::default()
        }
    }

    pub fn failing(at: FailAt) -> Self {
        Self {
            fail_at: Some(at),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Only the drawing calls, in order
    pub fn draws(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Rect { .. } | Call::Text { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, at: FailAt) -> Result<(), BackendError> {
        if self.fail_at == Some(at) {
            Err(BackendError::new(format!("{:?} failed", at)))
        } else {
            Ok(())
        }
    }
}

pub const SAVED_MARKER: &[u8] = b"%PDF-recorded";

impl DocumentMutator for RecordingMutator {
    type Document = ();
    type Font = StandardFont;

    async fn load(&self, _bytes: &[u8]) -> Result<(), BackendError> {
        self.record(Call::Load);
        self.check(FailAt::Load)
    }

    fn page_boxes(&self, _document: &()) -> Vec<PageBox> {
        self.page_boxes.clone()
    }

    async fn embed_standard_font(&self, _document: &mut (), font: StandardFont) -> Result<StandardFont, BackendError> {
        self.record(Call::Embed(font));
        Ok(font)
    }

    fn draw_rectangle(&self, _document: &mut (), page: u32, rect: &RectSpec) -> Result<(), BackendError> {
        self.check(FailAt::Draw)?;
        self.record(Call::Rect { page, rect: *rect });
        Ok(())
    }

    fn draw_text(
        &self,
        _document: &mut (),
        page: u32,
        text: &str,
        spec: &TextSpec<StandardFont>,
    ) -> Result<(), BackendError> {
        self.check(FailAt::Draw)?;
        self.record(Call::Text {
            page,
            text: text.to_string(),
            spec: spec.clone(),
        });
        Ok(())
    }

    async fn save(&self, _document: ()) -> Result<Vec<u8>, BackendError> {
        self.record(Call::Save);
        self.check(FailAt::Save)?;
        Ok(SAVED_MARKER.to_vec())
    }
}
