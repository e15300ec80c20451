use std::collections::BTreeSet;

/// Ids the user picked on the currently displayed page.
///
/// The set is bound to one page generation; [`SelectionSet::rebind`] empties it
/// as soon as a different page is displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
    generation: u64,
}

impl SelectionSet {
    /// Returns true if the selection was non-empty and got cleared.
    pub fn rebind(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            return false;
        }
        self.generation = generation;
        let had_any = !self.ids.is_empty();
        self.ids.clear();
        had_any
    }

    /// Toggle one id; ids not on the page are ignored.
    pub fn toggle<'a>(&mut self, id: &str, page_ids: impl IntoIterator<Item = &'a str>) -> bool {
        if !page_ids.into_iter().any(|candidate| candidate == id) {
            return false;
        }
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
        true
    }

    /// Select every id on the page, or clear if they already are all selected.
    pub fn toggle_all<'a>(&mut self, page_ids: impl IntoIterator<Item = &'a str>) {
        let page_ids: Vec<&str> = page_ids.into_iter().collect();
        if !page_ids.is_empty() && page_ids.iter().all(|id| self.ids.contains(*id)) {
            self.ids.clear();
        } else {
            self.ids = page_ids.into_iter().map(str::to_string).collect();
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}
