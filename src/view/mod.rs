//! Derived, paginated view over the remote collection
//!
//! - `projection`: pure filter/search/sort/paginate algorithm
//! - `format`: display helpers for table cells

mod format;
mod projection;

pub use format::{display_owner, format_date, format_size, type_badge, FileKind, TYPE_FILTERS};
pub use projection::{
    clamp_page, filter_and_sort, page_count, project, Projection, SortDirection, SortKey,
    ViewState,
};

use crate::error::{MediaError, MediaResult};
use crate::store::RemoteCollectionStore;
use std::sync::Arc;

/// View state plus the store it projects. Holds no records of its own.
pub struct CollectionView {
    store: Arc<RemoteCollectionStore>,
    state: ViewState,
}

impl CollectionView {
    pub fn new(store: Arc<RemoteCollectionStore>, page_size: usize) -> Self {
        CollectionView {
            store,
            state: ViewState {
                page_size: page_size.max(1),
                ..Default::default()
            },
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Recompute the visible page from the current collection, re-clamping the page index.
    pub fn current(&mut self) -> Projection {
        let records = self.store.snapshot();
        let projection = project(&records, &self.state);
        self.state.page_index = projection.page_index;
        projection
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.state.search_term = term.into();
        self.clamp();
    }

    pub fn set_type_filter(&mut self, prefix: impl Into<String>) {
        self.state.type_filter = prefix.into();
        self.clamp();
    }

    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.state.sort_key = key;
        self.state.sort_direction = direction;
    }

    /// Header click: flip direction on the active key, otherwise sort ascending by `key`.
    pub fn toggle_sort(&mut self, key: SortKey) {
        if self.state.sort_key == key {
            self.state.sort_direction = self.state.sort_direction.flipped();
        } else {
            self.state.sort_key = key;
            self.state.sort_direction = SortDirection::Asc;
        }
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> MediaResult<()> {
        if page_size == 0 {
            return Err(MediaError::Validation(
                "Page size must be at least 1".to_string(),
            ));
        }
        self.state.page_size = page_size;
        self.state.page_index = 1;
        Ok(())
    }

    pub fn set_page(&mut self, page_index: usize) -> usize {
        self.state.page_index = page_index;
        self.clamp()
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.state.page_index.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> usize {
        self.set_page(self.state.page_index.saturating_sub(1))
    }

    fn clamp(&mut self) -> usize {
        let filtered = filter_and_sort(&self.store.snapshot(), &self.state).len();
        self.state.page_index = clamp_page(self.state.page_index, filtered, self.state.page_size);
        self.state.page_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FileRecord;
    use crate::notify::LogNotifier;
    use crate::testing::{init_logging, FakeApi};

    fn view_over(records: Vec<FileRecord>, page_size: usize) -> (CollectionView, Arc<RemoteCollectionStore>) {
        init_logging();
        let store = Arc::new(RemoteCollectionStore::new(
            Arc::new(FakeApi::default()),
            Arc::new(LogNotifier),
        ));
        store.replace_all(records);
        (CollectionView::new(store.clone(), page_size), store)
    }

    fn mixed(n: usize) -> Vec<FileRecord> {
        (0..n)
            .map(|i| {
                let mime = if i % 3 == 0 { "image/png" } else { "text/plain" };
                FileRecord::new(i as i64, format!("file{:02}", i), mime)
            })
            .collect()
    }

    #[test]
    fn narrowing_filter_pulls_page_back_in_range() {
        let (mut view, _) = view_over(mixed(30), 5);
        assert_eq!(view.set_page(6), 6);

        // 10 images -> 2 pages
        view.set_type_filter("image/");
        assert_eq!(view.state().page_index, 2);

        view.set_search_term("file00");
        assert_eq!(view.state().page_index, 1);

        view.set_search_term("no such file");
        assert_eq!(view.state().page_index, 1);
        let page = view.current();
        assert!(page.items.is_empty());
        assert_eq!(page.page_count, 0);
    }

    #[test]
    fn shrinking_collection_is_clamped_on_next_projection() {
        let (mut view, store) = view_over(mixed(12), 10);
        view.set_page(2);
        assert_eq!(view.current().items.len(), 2);

        store.replace_all(mixed(4));
        let page = view.current();
        assert_eq!(page.page_index, 1);
        assert_eq!(view.state().page_index, 1);
        assert_eq!(page.items.len(), 4);
    }

    #[test]
    fn page_navigation_stays_in_bounds() {
        let (mut view, _) = view_over(mixed(25), 10);
        assert_eq!(view.prev_page(), 1);
        assert_eq!(view.next_page(), 2);
        assert_eq!(view.next_page(), 3);
        assert_eq!(view.next_page(), 3);

        view.set_page_size(25).unwrap();
        assert_eq!(view.state().page_index, 1);
        assert!(view.set_page_size(0).unwrap_err().is_validation());
    }

    #[test]
    fn toggle_sort_flips_or_switches() {
        let (mut view, _) = view_over(Vec::new(), 10);
        assert_eq!(view.state().sort_key, SortKey::Date);
        assert_eq!(view.state().sort_direction, SortDirection::Desc);

        view.toggle_sort(SortKey::Date);
        assert_eq!(view.state().sort_direction, SortDirection::Asc);

        view.toggle_sort(SortKey::Name);
        assert_eq!(view.state().sort_key, SortKey::Name);
        assert_eq!(view.state().sort_direction, SortDirection::Asc);
    }
}
