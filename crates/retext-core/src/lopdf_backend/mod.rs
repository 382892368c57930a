//! Decoder and mutator backed by `lopdf`
//!
//! This backend needs no native renderer: it reports page geometry and text
//! runs but never rasterises, and estimates run widths with the glyph-aspect
//! heuristic instead of real font metrics.

mod decoder;
mod mutator;

pub use decoder::{LopdfDecoder, LopdfPage};
pub use mutator::{EditableDocument, FontHandle, LopdfMutator};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::coords::PageBox;

/// US Letter, used when a page has no usable MediaBox
const LETTER: PageBox = PageBox::sized(612.0, 792.0);

/// Guard against cyclic /Parent chains in malformed files
const MAX_INHERITANCE_DEPTH: usize = 32;

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Follow a single indirect reference
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).and_then(|o| o.as_dict().ok())
}

/// Look up an inheritable page attribute, walking up the page tree
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The page's MediaBox, normalised so that `x0 <= x1` and `y0 <= y1`
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let values: Option<Vec<f64>> = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| {
            arr.iter()
                .filter_map(|o| resolve(doc, o).and_then(number))
                .collect()
        });

    match values.as_deref() {
        Some(&[x0, y0, x1, y1]) => PageBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)),
        _ => LETTER,
    }
}
