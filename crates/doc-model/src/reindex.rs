//! Page-index bookkeeping for page removal and insertion.
//!
//! Removing page `k` drops everything on `k` and shifts everything above it
//! down by one. Inserting at `at` shifts everything on `at` and above up by
//! one. The same rule is applied to element collections and to every
//! snapshot held in history stacks, so no reference to a vanished page
//! survives.

use crate::element::PageElement;
use crate::history::{HistoryStacks, PageHistory, Snapshot};

pub fn remove_page_items<T: PageElement>(items: &mut Vec<T>, removed: usize) {
    items.retain(|item| item.page_index() != removed);
    for item in items.iter_mut() {
        let page = item.page_index();
        if page > removed {
            item.set_page_index(page - 1);
        }
    }
}

pub fn insert_page_items<T: PageElement>(items: &mut [T], at: usize) {
    for item in items.iter_mut() {
        let page = item.page_index();
        if page >= at {
            item.set_page_index(page + 1);
        }
    }
}

fn remap_snapshot_after_removal(snapshot: &mut Snapshot, removed: usize) {
    snapshot.retain_items(|page| page != removed);
    snapshot.for_each_page_ref(|page| {
        if *page > removed {
            *page -= 1;
        }
    });
}

fn remap_snapshot_after_insertion(snapshot: &mut Snapshot, at: usize) {
    snapshot.for_each_page_ref(|page| {
        if *page >= at {
            *page += 1;
        }
    });
}

pub fn remap_stacks_after_removal(stacks: &mut HistoryStacks, removed: usize) {
    let previous = std::mem::take(stacks);
    for (page, mut history) in previous {
        if page == removed {
            continue;
        }
        let key = if page > removed { page - 1 } else { page };
        for_each_snapshot(&mut history, |snapshot| remap_snapshot_after_removal(snapshot, removed));
        stacks.insert(key, history);
    }
}

pub fn remap_stacks_after_insertion(stacks: &mut HistoryStacks, at: usize) {
    let previous = std::mem::take(stacks);
    for (page, mut history) in previous {
        let key = if page >= at { page + 1 } else { page };
        for_each_snapshot(&mut history, |snapshot| remap_snapshot_after_insertion(snapshot, at));
        stacks.insert(key, history);
    }
}

fn for_each_snapshot(history: &mut PageHistory, mut f: impl FnMut(&mut Snapshot)) {
    history.undo.iter_mut().chain(history.redo.iter_mut()).for_each(&mut f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::NormRect;
    use crate::element::{ImageItem, TextItem};
    use proptest::prelude::*;

    fn text_on(page: usize) -> TextItem {
        TextItem::new(format!("p{page}"), page, 0.1, 0.1)
    }

    fn snapshot_on(page: usize) -> Snapshot {
        Snapshot {
            page_index: page,
            text_items: vec![text_on(page)],
            image_items: vec![ImageItem::new("a.png", page, NormRect::default())],
            shape_items: None,
            annotations: None,
        }
    }

    fn stacks_for(pages: &[usize]) -> HistoryStacks {
        pages
            .iter()
            .map(|&page| {
                (page, PageHistory { undo: vec![snapshot_on(page)], redo: vec![snapshot_on(page)] })
            })
            .collect()
    }

    #[test]
    fn removing_middle_page_drops_and_shifts() {
        let mut items: Vec<TextItem> = [0, 1, 1, 2].into_iter().map(text_on).collect();

        remove_page_items(&mut items, 1);

        let pages: Vec<usize> = items.iter().map(|item| item.page_index).collect();
        assert_eq!(pages, vec![0, 1]);
        assert_eq!(items[1].text, "p2");
    }

    #[test]
    fn removal_scenario_from_three_pages() {
        let mut items: Vec<TextItem> = [0, 1, 1, 2].into_iter().map(text_on).collect();
        let mut stacks = stacks_for(&[0, 1, 2]);

        remove_page_items(&mut items, 1);
        remap_stacks_after_removal(&mut stacks, 1);

        assert_eq!(items.len(), 2);
        assert_eq!(stacks.keys().copied().collect::<Vec<_>>(), vec![0, 1]);

        let moved = &stacks[&1].undo[0];
        assert_eq!(moved.page_index, 1);
        assert_eq!(moved.text_items[0].page_index, 1);
        assert_eq!(moved.text_items[0].text, "p2");
        assert_eq!(moved.image_items[0].page_index, 1);
    }

    #[test]
    fn insertion_is_structural_inverse() {
        let mut items: Vec<TextItem> = [0, 1, 2].into_iter().map(text_on).collect();
        let mut stacks = stacks_for(&[0, 1, 2]);
        let original_items = items.clone();
        let original_stacks = stacks.clone();

        insert_page_items(&mut items, 1);
        remap_stacks_after_insertion(&mut stacks, 1);

        assert_eq!(items.iter().map(|i| i.page_index).collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_eq!(stacks.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_eq!(stacks[&3].redo[0].text_items[0].page_index, 3);

        remove_page_items(&mut items, 1);
        remap_stacks_after_removal(&mut stacks, 1);
        assert_eq!(items, original_items);
        assert_eq!(stacks, original_stacks);
    }

    proptest! {
        #[test]
        fn removal_never_leaves_references_to_removed_page(
            pages in prop::collection::vec(0usize..8, 0..40),
            extra in 1usize..4,
            k_seed in 0usize..64,
        ) {
            let page_count = pages.iter().copied().max().map_or(0, |max| max + 1) + extra;
            let removed = k_seed % page_count;

            let mut items: Vec<TextItem> = pages.iter().copied().map(text_on).collect();
            let keys: Vec<usize> = (0..page_count).collect();
            let mut stacks = stacks_for(&keys);

            remove_page_items(&mut items, removed);
            remap_stacks_after_removal(&mut stacks, removed);

            let expected: Vec<usize> = pages
                .iter()
                .copied()
                .filter(|&p| p != removed)
                .map(|p| if p > removed { p - 1 } else { p })
                .collect();
            let actual: Vec<usize> = items.iter().map(|item| item.page_index).collect();
            prop_assert_eq!(actual, expected);

            prop_assert_eq!(stacks.len(), page_count - 1);
            for (key, history) in &stacks {
                prop_assert!(*key < page_count - 1);
                for snapshot in history.undo.iter().chain(history.redo.iter()) {
                    prop_assert_eq!(snapshot.page_index, *key);
                    prop_assert!(snapshot.text_items.iter().all(|item| item.page_index == *key));
                }
            }
        }
    }
}
