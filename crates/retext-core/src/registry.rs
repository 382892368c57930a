//! Fragment registry: the single source of truth for overlay text

use std::collections::BTreeMap;
use tracing::trace;

use crate::error::EditorError;
use crate::fragment::{FragmentId, TextFragment};

/// Append-only store of fragments keyed by id, with one mutation: committing
/// new text. Iteration is ordered by `(page, ordinal)`.
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    fragments: BTreeMap<FragmentId, TextFragment>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fragment. Ids must be unique per document load.
    pub fn register(&mut self, fragment: TextFragment) -> Result<(), EditorError> {
        let id = fragment.id();
        if self.fragments.contains_key(&id) {
            return Err(EditorError::DuplicateFragment(id));
        }
        self.fragments.insert(id, fragment);
        Ok(())
    }

    /// Set a fragment's current text.
    ///
    /// Unknown ids are ignored (stale overlay references from a superseded
    /// load) and return `false`.
    pub fn commit_edit(&mut self, id: FragmentId, new_text: impl Into<String>) -> bool {
        match self.fragments.get_mut(&id) {
            Some(fragment) => {
                fragment.set_current_text(new_text.into());
                true
            }
            None => {
                trace!(fragment = %id, "Ignoring edit for unknown fragment");
                false
            }
        }
    }

    pub fn get(&self, id: FragmentId) -> Option<&TextFragment> {
        self.fragments.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextFragment> {
        self.fragments.values()
    }

    /// Fragments whose text was changed. Each call starts a fresh pass.
    pub fn iter_dirty(&self) -> impl Iterator<Item = &TextFragment> {
        self.fragments.values().filter(|f| f.is_dirty())
    }

    pub fn dirty_count(&self) -> usize {
        self.iter_dirty().count()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
