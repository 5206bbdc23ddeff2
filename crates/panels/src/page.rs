//! Grid geometry and the pagination algorithm.
use std::{collections::VecDeque, fmt};

use crate::{Error, Result};

/// Smallest grid that can hold a parent key, a content key and a next key.
pub const MIN_CAPACITY: usize = 3;

/// Key grid geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Number of key rows.
    rows: usize,
    /// Number of key columns.
    cols: usize,
}

impl Layout {
    /// Validate and build a layout.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let capacity = rows.saturating_mul(cols);
        if capacity < MIN_CAPACITY {
            return Err(Error::Layout {
                rows,
                cols,
                min: MIN_CAPACITY,
            });
        }
        Ok(Self { rows, cols })
    }

    /// Number of key rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of key columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Keys per page.
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Key index of grid cell `(x, y)`, if it lies on the grid.
    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.cols && y < self.rows).then(|| y * self.cols + x)
    }
}

/// What occupies one key slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot<T> {
    /// Navigate to the parent panel.
    Parent,
    /// Go to the previous page.
    PreviousPage,
    /// Go to the next page.
    NextPage,
    /// A child item.
    Item(T),
}

impl<T> Slot<T> {
    /// Whether this is a synthesized navigation key.
    pub fn is_navigation(&self) -> bool {
        !matches!(self, Self::Item(_))
    }

    /// The child item, if any.
    pub fn item(&self) -> Option<&T> {
        match self {
            Self::Item(t) => Some(t),
            _ => None,
        }
    }
}

/// One fixed-capacity grid of slots. Position is the index into `slots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Page number within the panel.
    number: usize,
    /// Maximum slots.
    capacity: usize,
    /// Occupied slots; positions are contiguous from zero.
    slots: Vec<Slot<T>>,
}

impl<T: Copy + PartialEq> Page<T> {
    /// An empty page.
    pub fn new(number: usize, capacity: usize) -> Self {
        Self {
            number,
            capacity,
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Page number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Occupied slot count.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Free slot count.
    pub fn space_left(&self) -> usize {
        self.capacity - self.slots.len()
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.space_left() == 0
    }

    /// Slots in position order.
    pub fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    /// Slot at a key position.
    pub fn get(&self, position: usize) -> Option<Slot<T>> {
        self.slots.get(position).copied()
    }

    /// Position of a child item.
    pub fn position_of(&self, item: T) -> Option<usize> {
        self.slots.iter().position(|s| *s == Slot::Item(item))
    }

    /// Position of a navigation slot.
    pub fn position_of_slot(&self, slot: Slot<T>) -> Option<usize> {
        self.slots.iter().position(|s| *s == slot)
    }

    /// Child items in position order.
    pub fn items(&self) -> impl Iterator<Item = T> + '_ {
        self.slots.iter().filter_map(|s| s.item().copied())
    }

    /// Append a slot at the next position.
    fn push(&mut self, slot: Slot<T>) {
        debug_assert!(!self.is_full());
        self.slots.push(slot);
    }
}

impl<T: fmt::Debug> fmt::Display for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} [", self.number)?;
        for (i, s) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match s {
                Slot::Parent => write!(f, "{i}:parent")?,
                Slot::PreviousPage => write!(f, "{i}:previous")?,
                Slot::NextPage => write!(f, "{i}:next")?,
                Slot::Item(t) => write!(f, "{i}:{t:?}")?,
            }
        }
        f.write_str("]")
    }
}

/// Lay `items` out into pages of `layout.capacity()` slots.
///
/// Slot 0 of page 0 holds the parent key when `has_parent`. Every page after
/// the first opens with a previous-page key. When a single slot remains and
/// more items are still pending, that slot becomes a next-page key and the
/// item moves on; the final item always takes the last slot. No items still
/// yields one page.
pub fn paginate<T: Copy + PartialEq>(items: &[T], has_parent: bool, layout: &Layout) -> Vec<Page<T>> {
    let capacity = layout.capacity();
    let mut pages = vec![Page::new(0, capacity)];
    if has_parent {
        pages[0].push(Slot::Parent);
    }
    let mut pending: VecDeque<T> = items.iter().copied().collect();

    while let Some(item) = pending.pop_front() {
        if pages.last().is_some_and(Page::is_full) {
            pages.push(Page::new(pages.len(), capacity));
        }
        let first_page = pages.len() == 1;
        let Some(page) = pages.last_mut() else {
            break;
        };
        if page.is_empty() && !first_page {
            page.push(Slot::PreviousPage);
        }
        let space_left = page.space_left();
        if space_left > 1 || (space_left == 1 && pending.is_empty()) {
            page.push(Slot::Item(item));
        } else {
            page.push(Slot::NextPage);
            pending.push_front(item);
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Layout {
        Layout::new(3, 5).unwrap()
    }

    fn count_items(pages: &[Page<usize>]) -> Vec<usize> {
        pages.iter().flat_map(|p| p.items().collect::<Vec<_>>()).collect()
    }

    #[test]
    fn empty_panel_has_one_page() {
        let pages = paginate::<usize>(&[], false, &grid());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());

        let pages = paginate::<usize>(&[], true, &grid());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].slots(), &[Slot::Parent]);
    }

    #[test]
    fn last_item_takes_final_slot() {
        let items: Vec<usize> = (0..14).collect();
        let pages = paginate(&items, true, &grid());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 15);
        assert_eq!(pages[0].get(0), Some(Slot::Parent));
        assert!(pages[0].position_of_slot(Slot::NextPage).is_none());
        assert_eq!(count_items(&pages), items);
    }

    #[test]
    fn capacity_children_with_parent_overflow() {
        let items: Vec<usize> = (0..15).collect();
        let pages = paginate(&items, true, &grid());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].get(0), Some(Slot::Parent));
        assert_eq!(pages[0].items().count(), 13);
        assert_eq!(pages[0].get(14), Some(Slot::NextPage));
        assert_eq!(
            pages[1].slots(),
            &[Slot::PreviousPage, Slot::Item(13), Slot::Item(14)]
        );
    }

    #[test]
    fn seventeen_children_with_parent() {
        let items: Vec<usize> = (0..17).collect();
        let pages = paginate(&items, true, &grid());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 15);
        assert_eq!(pages[0].get(0), Some(Slot::Parent));
        assert_eq!(pages[0].get(14), Some(Slot::NextPage));
        assert_eq!(pages[1].len(), 5);
        assert_eq!(pages[1].get(0), Some(Slot::PreviousPage));
        assert_eq!(pages[1].items().collect::<Vec<_>>(), vec![13, 14, 15, 16]);
    }

    #[test]
    fn middle_pages_carry_both_navigation_keys() {
        let items: Vec<usize> = (0..40).collect();
        let pages = paginate(&items, false, &grid());
        // 14 + 13 + 13
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].get(0), Some(Slot::PreviousPage));
        assert_eq!(pages[1].get(14), Some(Slot::NextPage));
        assert_eq!(pages[2].get(0), Some(Slot::PreviousPage));
        assert!(pages[2].position_of_slot(Slot::NextPage).is_none());
        assert_eq!(count_items(&pages), items);
    }

    #[test]
    fn capacity_and_completeness_hold_across_sizes() {
        for (rows, cols) in [(2, 3), (3, 5), (4, 8), (1, 3)] {
            let layout = Layout::new(rows, cols).unwrap();
            for n in 0..70 {
                for has_parent in [false, true] {
                    let items: Vec<usize> = (0..n).collect();
                    let pages = paginate(&items, has_parent, &layout);
                    assert!(!pages.is_empty());
                    for (i, p) in pages.iter().enumerate() {
                        assert!(p.len() <= layout.capacity());
                        assert_eq!(p.number(), i);
                        let nexts = p.slots().iter().filter(|s| **s == Slot::NextPage).count();
                        let expect_next = usize::from(i + 1 < pages.len());
                        assert_eq!(nexts, expect_next, "{rows}x{cols} n={n} page {i}");
                    }
                    assert_eq!(count_items(&pages), items);
                }
            }
        }
    }

    #[test]
    fn layout_rejects_tiny_grids() {
        assert!(Layout::new(1, 2).is_err());
        assert!(Layout::new(0, 5).is_err());
        let l = Layout::new(3, 5).unwrap();
        assert_eq!(l.index_of(4, 2), Some(14));
        assert_eq!(l.index_of(5, 0), None);
    }
}
