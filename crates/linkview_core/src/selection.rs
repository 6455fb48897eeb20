//! Interactive sub-selection of the currently bound dataset.

/// Row indices into the bound dataset. Empty means "every row".
///
/// Indices are only meaningful against the dataset they were made on, so
/// binding a new dataset always clears the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    indices: Vec<usize>,
    bound_len: usize,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `indices`, discarding any that are out of range for the bound
    /// dataset. The stored set is sorted and free of duplicates.
    pub fn set(&mut self, indices: impl IntoIterator<Item = usize>) -> &[usize] {
        let mut kept: Vec<usize> = indices.into_iter().collect();
        let requested = kept.len();
        kept.retain(|&i| i < self.bound_len);
        kept.sort_unstable();
        kept.dedup();

        if kept.len() < requested {
            tracing::debug!(
                requested,
                kept = kept.len(),
                bound_len = self.bound_len,
                "Selection clamped"
            );
        }
        self.indices = kept;
        &self.indices
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Rebind to a new dataset of `len` rows, clearing the selection.
    pub fn on_dataset_replaced(&mut self, len: usize) {
        self.indices.clear();
        self.bound_len = len;
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn bound_len(&self) -> usize {
        self.bound_len
    }
}
