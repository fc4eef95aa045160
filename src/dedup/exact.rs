// src/dedup/exact.rs
use std::collections::HashSet;

use crate::model::Item;

/// Identifiers accepted so far in one orchestrator invocation.
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` is new to this run (and remembers it).
    pub fn admit(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    /// Keep the first copy of every identifier; returns `(kept, dropped)`.
    pub fn filter_page(&mut self, items: Vec<Item>) -> (Vec<Item>, usize) {
        let before = items.len();
        let kept: Vec<Item> = items.into_iter().filter(|i| self.admit(&i.id)).collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawItem;
    use chrono::Utc;

    fn item(id: &str) -> Item {
        Item::from_raw(&RawItem::new(id, "Tin steady", Utc::now()), 500).unwrap()
    }

    #[test]
    fn same_id_twice_in_a_page_forwards_one() {
        let mut seen = SeenIds::new();
        let (kept, dropped) = seen.filter_page(vec![item("a"), item("b"), item("a")]);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn memory_spans_pages() {
        let mut seen = SeenIds::new();
        seen.filter_page(vec![item("a")]);
        let (kept, dropped) = seen.filter_page(vec![item("a"), item("c")]);
        assert_eq!(kept[0].id, "c");
        assert_eq!(dropped, 1);
        assert_eq!(seen.len(), 2);
    }
}
