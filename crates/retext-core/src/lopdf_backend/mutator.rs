use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::{inherited_attribute, media_box, resolve_dict};
use crate::backend::{DocumentMutator, RectSpec, TextSpec};
use crate::color::Rgb;
use crate::coords::PageBox;
use crate::error::BackendError;
use crate::fonts::StandardFont;

/// An embedded standard font and the resource name it is drawn with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    font: StandardFont,
    object_id: ObjectId,
    resource_name: String,
}

impl FontHandle {
    pub fn font(&self) -> StandardFont {
        self.font
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }
}

#[derive(Debug, Default)]
struct PageEdits {
    operations: Vec<Operation>,
    fonts: BTreeMap<String, ObjectId>,
}

/// A loaded document plus the drawing queued against its pages
#[derive(Debug)]
pub struct EditableDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
    /// Font resource names already used by some page
    taken_names: HashSet<Vec<u8>>,
    embedded_fonts: usize,
    pending: BTreeMap<u32, PageEdits>,
}

impl EditableDocument {
    fn edits_for(&mut self, page: u32) -> Result<&mut PageEdits, BackendError> {
        if page == 0 || page as usize > self.page_ids.len() {
            return Err(BackendError::new(format!(
                "page {} out of range (document has {} pages)",
                page,
                self.page_ids.len()
            )));
        }
        Ok(self.pending.entry(page).or_default())
    }

    fn next_font_name(&mut self) -> String {
        loop {
            self.embedded_fonts += 1;
            let name = format!("RtF{}", self.embedded_fonts);
            if !self.taken_names.contains(name.as_bytes()) {
                return name;
            }
        }
    }
}

/// Paints edits into the page content of a `lopdf` document
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMutator;

impl LopdfMutator {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentMutator for LopdfMutator {
    type Document = EditableDocument;
    type Font = FontHandle;

    async fn load(&self, bytes: &[u8]) -> Result<EditableDocument, BackendError> {
        let inner = Document::load_mem(bytes)?;
        if inner.is_encrypted() {
            return Err(BackendError::new("encrypted documents are not supported"));
        }
        let page_ids: Vec<ObjectId> = inner.get_pages().into_values().collect();
        let taken_names = page_ids
            .iter()
            .flat_map(|&id| font_resource_names(&inner, id))
            .collect();
        Ok(EditableDocument {
            inner,
            page_ids,
            taken_names,
            embedded_fonts: 0,
            pending: BTreeMap::new(),
        })
    }

    fn page_boxes(&self, document: &EditableDocument) -> Vec<PageBox> {
        document
            .page_ids
            .iter()
            .map(|&id| media_box(&document.inner, id))
            .collect()
    }

    async fn embed_standard_font(
        &self,
        document: &mut EditableDocument,
        font: StandardFont,
    ) -> Result<FontHandle, BackendError> {
        let mut dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.pdf_name(),
        };
        if !font.is_symbolic() {
            dict.set("Encoding", "WinAnsiEncoding");
        }

        let object_id = document.inner.add_object(dict);
        let resource_name = document.next_font_name();
        debug!(font = %font, resource = %resource_name, "Embedded standard font");

        Ok(FontHandle {
            font,
            object_id,
            resource_name,
        })
    }

    fn draw_rectangle(
        &self,
        document: &mut EditableDocument,
        page: u32,
        rect: &RectSpec,
    ) -> Result<(), BackendError> {
        let edits = document.edits_for(page)?;
        edits.operations.extend([
            Operation::new("q", vec![]),
            fill_color(rect.color),
            Operation::new(
                "re",
                vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(
        &self,
        document: &mut EditableDocument,
        page: u32,
        text: &str,
        spec: &TextSpec<FontHandle>,
    ) -> Result<(), BackendError> {
        let edits = document.edits_for(page)?;
        edits
            .fonts
            .insert(spec.font.resource_name.clone(), spec.font.object_id);

        let bytes = if spec.font.font.is_symbolic() {
            text.bytes().collect()
        } else {
            encode_win_ansi(text)
        };

        edits.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            fill_color(spec.color),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(spec.font.resource_name.as_bytes().to_vec()),
                    real(spec.size),
                ],
            ),
            Operation::new("Td", vec![real(spec.x), real(spec.y)]),
            Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    async fn save(&self, mut document: EditableDocument) -> Result<Vec<u8>, BackendError> {
        let pending = std::mem::take(&mut document.pending);
        for (page, edits) in pending {
            let page_id = *document
                .page_ids
                .get(page as usize - 1)
                .ok_or_else(|| BackendError::new(format!("page {} out of range", page)))?;
            append_edits(&mut document.inner, page_id, edits)?;
        }

        let mut buffer = Vec::new();
        document.inner.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

/// Isolate the original content in `q ... Q`, then append the edit stream
/// and make the edit fonts visible to the page.
fn append_edits(doc: &mut Document, page_id: ObjectId, edits: PageEdits) -> Result<(), BackendError> {
    let encoded = Content {
        operations: edits.operations,
    }
    .encode()?;

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));
    let edit_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let mut contents = vec![Object::Reference(save_id)];
    contents.extend(existing_contents(doc, page_id));
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(edit_id));

    let resources = resources_with_fonts(doc, page_id, &edits.fonts);

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn font_resource_names(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|f| resolve_dict(doc, f))
        .map(|fonts| fonts.iter().map(|(name, _)| name.clone()).collect())
        .unwrap_or_default()
}

/// The page's content stream references, flattening an indirect array
fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(contents) = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
    else {
        return Vec::new();
    };

    match contents {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    }
}

/// A copy of the page's (possibly inherited) resources with `fonts` added
fn resources_with_fonts(
    doc: &Document,
    page_id: ObjectId,
    fonts: &BTreeMap<String, ObjectId>,
) -> Dictionary {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let mut font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|f| resolve_dict(doc, f))
        .cloned()
        .unwrap_or_default();
    for (name, id) in fonts {
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));
    resources
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn fill_color(color: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            Object::Real(color.r),
            Object::Real(color.g),
            Object::Real(color.b),
        ],
    )
}

/// Encode text for a WinAnsiEncoding font; unmappable characters become '?'
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => ch as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}
