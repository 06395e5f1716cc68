//! Compact type item storage.

use crate::{Idx, Tag};

/// A single type item in the pool.
///
/// - `tag`: identifies the type kind (see [`Tag`])
/// - `data`: child index, extra-array offset or side-table index
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Item {
    pub tag: Tag,
    pub data: u32,
}

impl Item {
    /// Create a new item with the given tag and data.
    #[inline]
    pub const fn new(tag: Tag, data: u32) -> Self {
        Self { tag, data }
    }

    /// Create a basic type item.
    #[inline]
    pub const fn basic(tag: Tag) -> Self {
        Self { tag, data: 0 }
    }

    /// Get the child index for single-child types.
    #[inline]
    pub const fn child(self) -> Idx {
        Idx::from_raw(self.data)
    }
}

gossa_ir::static_assert_size!(Item, 8);
