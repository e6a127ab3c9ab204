//! Ids chosen for bulk actions, kept in the order they were picked

use crate::api::RecordId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<RecordId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    /// Flip one id. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if let Some(pos) = self.ids.iter().position(|&selected| selected == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    /// True when the page is non-empty and every id on it is selected.
    pub fn all_selected(&self, page: &[RecordId]) -> bool {
        !page.is_empty() && page.iter().all(|id| self.contains(*id))
    }

    /// Header checkbox: deselect the page if it is fully selected, otherwise select the rest of it.
    ///
    /// Ids outside `page` are never touched.
    pub fn toggle_all(&mut self, page: &[RecordId]) {
        if self.all_selected(page) {
            self.ids.retain(|id| !page.contains(id));
        } else {
            for &id in page {
                if !self.contains(id) {
                    self.ids.push(id);
                }
            }
        }
    }

    /// Selected ids that are on `page`, in selection order.
    pub fn visible(&self, page: &[RecordId]) -> Vec<RecordId> {
        self.ids
            .iter()
            .copied()
            .filter(|id| page.contains(id))
            .collect()
    }

    pub fn remove_many(&mut self, ids: &[RecordId]) {
        self.ids.retain(|id| !ids.contains(id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
