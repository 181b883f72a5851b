//! A type-erased, growable byte buffer holding one component's values for
//! every row of an archetype. Rows are not individually-typed objects;
//! callers operate on raw byte ranges at `row * element_size`, collapsed
//! into one type since this crate has no generic, statically-typed
//! `push<C>` entry point: every write goes through the archetype
//! migration path instead.

use std::alloc::{self, Layout, handle_alloc_error};
use std::ptr::{self, NonNull};

use crate::component::Info;

/// Owns one archetype's worth of a single component's rows.
pub(crate) struct Column {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
    element_layout: Layout,
    drop_fn: unsafe fn(*mut u8),
}

impl Column {
    pub(crate) fn new(info: Info) -> Self {
        let element_layout = info.layout();
        // A dangling pointer aligned to the *component's* alignment, not
        // u8's: zero-sized components can still demand non-1 alignment.
        let ptr = NonNull::new(element_layout.align() as *mut u8).expect("alignment is never zero");
        Column { ptr, len: 0, capacity: 0, element_layout, drop_fn: info.drop_fn() }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn element_size(&self) -> usize {
        self.element_layout.size()
    }

    fn is_zero_sized(&self) -> bool {
        self.element_size() == 0
    }

    /// Growth policy: empty buffers grow to 16 elements; otherwise the
    /// capacity doubles. New bytes are zero-initialised.
    fn grow(&mut self) {
        if self.is_zero_sized() {
            self.capacity = self.capacity.max(1).saturating_mul(2).max(16);
            return;
        }

        let new_capacity = if self.capacity == 0 { 16 } else { self.capacity * 2 };
        let new_layout = array_layout(self.element_layout, new_capacity);

        let new_ptr = if self.capacity == 0 {
            // SAFETY: new_layout has non-zero size (checked above via is_zero_sized).
            unsafe { alloc::alloc_zeroed(new_layout) }
        } else {
            let old_layout = array_layout(self.element_layout, self.capacity);
            // SAFETY: ptr was allocated with old_layout by a prior call to this function.
            let grown = unsafe { alloc::realloc(self.ptr.as_ptr(), old_layout, new_layout.size()) };
            if !grown.is_null() {
                // SAFETY: bytes in [old_layout.size(), new_layout.size()) are uninitialised
                // after realloc; zero them to preserve deterministic component defaults.
                unsafe {
                    ptr::write_bytes(grown.add(old_layout.size()), 0, new_layout.size() - old_layout.size());
                }
            }
            grown
        };

        let new_ptr = match NonNull::new(new_ptr) {
            Some(p) => p,
            None => handle_alloc_error(new_layout),
        };

        self.ptr = new_ptr;
        self.capacity = new_capacity;
    }

    fn ensure_capacity(&mut self, required: usize) {
        while self.capacity < required {
            self.grow();
        }
    }

    /// Row `row`'s byte address. `row` must be `< len` (or, for the
    /// freshly-reserved tail slot, `< capacity`).
    fn ptr_at(&self, row: usize) -> *const u8 {
        if self.is_zero_sized() {
            return self.ptr.as_ptr();
        }
        // SAFETY: caller guarantees row < capacity.
        unsafe { self.ptr.as_ptr().add(row * self.element_size()) }
    }

    fn ptr_at_mut(&mut self, row: usize) -> *mut u8 {
        if self.is_zero_sized() {
            return self.ptr.as_ptr();
        }
        // SAFETY: caller guarantees row < capacity.
        unsafe { self.ptr.as_ptr().add(row * self.element_size()) }
    }

    /// Appends a zero-initialised row and returns its index.
    pub(crate) fn push_default(&mut self) -> usize {
        self.ensure_capacity(self.len + 1);
        let row = self.len;
        self.len += 1;
        row
    }

    /// Overwrites row `row` with `element_size` bytes from `src`, without
    /// dropping whatever was previously there. Used when the row is known
    /// to be freshly allocated (zero bytes) or when the prior value was
    /// already moved out by the caller.
    ///
    /// # Safety
    /// `src` must point at `element_size()` readable bytes of the same
    /// component type this column was created for.
    pub(crate) unsafe fn write_row(&mut self, row: usize, src: *const u8) {
        debug_assert!(row < self.len);
        if self.is_zero_sized() {
            return;
        }
        let dst = self.ptr_at_mut(row);
        // SAFETY: caller guarantees src/dst do not overlap and src is valid.
        unsafe { ptr::copy_nonoverlapping(src, dst, self.element_size()) };
    }

    /// Raw pointer to row `row`'s bytes.
    pub(crate) fn row_ptr(&self, row: usize) -> *const u8 {
        debug_assert!(row < self.len);
        self.ptr_at(row)
    }

    pub(crate) fn row_ptr_mut(&mut self, row: usize) -> *mut u8 {
        debug_assert!(row < self.len);
        self.ptr_at_mut(row)
    }

    /// Runs the destructor on row `row`'s current value, without touching
    /// `len`. Used when a row is being dropped outright rather than moved.
    pub(crate) fn drop_row(&mut self, row: usize) {
        debug_assert!(row < self.len);
        let ptr = self.ptr_at_mut(row);
        // SAFETY: row < len, so ptr addresses a live, initialised value.
        unsafe { (self.drop_fn)(ptr) };
    }

    /// Moves the last row into `row`'s slot (no-op if `row` is already
    /// last) and shrinks `len` by one. Does not run any destructor: the
    /// caller is responsible for dropping `row`'s prior value first if it
    /// is being discarded, or for having already moved it elsewhere.
    pub(crate) fn swap_truncate(&mut self, row: usize) {
        debug_assert!(row < self.len);
        let last = self.len - 1;
        if row != last && !self.is_zero_sized() {
            let last_ptr = self.ptr_at(last);
            let row_ptr = self.ptr_at_mut(row);
            // SAFETY: row and last are distinct, in-bounds rows of the same buffer.
            unsafe { ptr::copy_nonoverlapping(last_ptr, row_ptr, self.element_size()) };
        }
        self.len -= 1;
    }

    /// Drops row `row`'s value, then performs [`Self::swap_truncate`].
    /// Drops then structurally removes a row in one step.
    pub(crate) fn swap_remove_dropping(&mut self, row: usize) {
        self.drop_row(row);
        self.swap_truncate(row);
    }

    pub(crate) fn clear(&mut self) {
        for row in 0..self.len {
            self.drop_row(row);
        }
        self.len = 0;
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        self.clear();
        if self.capacity > 0 && !self.is_zero_sized() {
            let layout = array_layout(self.element_layout, self.capacity);
            // SAFETY: ptr was allocated with this layout and is not used again after drop.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

fn array_layout(element: Layout, count: usize) -> Layout {
    let size = element.size().checked_mul(count).expect("column size overflow");
    Layout::from_size_align(size, element.align()).expect("invalid column layout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropTracker {
        counter: Arc<AtomicUsize>,
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn info_for<T>() -> Info {
        unsafe fn drop_in_place<T>(ptr: *mut u8) {
            unsafe { std::ptr::drop_in_place(ptr.cast::<T>()) }
        }
        // mirrors component::Info::of<T>() without requiring T: Component
        // in this low-level test module.
        Info::for_test(Layout::new::<T>(), drop_in_place::<T>)
    }

    #[test]
    fn push_default_then_write_row_round_trips() {
        // Given an empty i32 column
        let mut column = Column::new(info_for::<i32>());

        // When a row is pushed and then written
        let row = column.push_default();
        let value: i32 = 42;
        unsafe { column.write_row(row, (&value as *const i32).cast()) };

        // Then reading it back yields the written value
        let read = unsafe { *column.row_ptr(row).cast::<i32>() };
        assert_eq!(read, 42);
    }

    #[test]
    fn swap_remove_drops_evicted_value() {
        // Given a column of two drop-tracked values
        let counter = Arc::new(AtomicUsize::new(0));
        let mut column = Column::new(info_for::<DropTracker>());
        for _ in 0..2 {
            let row = column.push_default();
            let value = DropTracker { counter: counter.clone() };
            unsafe { column.write_row(row, (&value as *const DropTracker).cast()) };
            std::mem::forget(value);
        }

        // When row 0 is swap-removed
        column.swap_remove_dropping(0);

        // Then exactly one value has been dropped and one row remains
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(column.len(), 1);
    }

    #[test]
    fn swap_truncate_moves_last_row_without_dropping() {
        // Given a column with two rows, the second marked as moved-out
        let mut column = Column::new(info_for::<i32>());
        let r0 = column.push_default();
        let r1 = column.push_default();
        let a: i32 = 1;
        let b: i32 = 2;
        unsafe {
            column.write_row(r0, (&a as *const i32).cast());
            column.write_row(r1, (&b as *const i32).cast());
        }

        // When row 0 is truncated away via a raw move (no drop)
        column.swap_truncate(0);

        // Then row 0 now holds what was row 1's value
        assert_eq!(column.len(), 1);
        let read = unsafe { *column.row_ptr(0).cast::<i32>() };
        assert_eq!(read, 2);
    }

    #[test]
    fn growth_doubles_and_zero_initialises() {
        // Given an empty column
        let mut column = Column::new(info_for::<u64>());

        // When 17 rows are pushed (forcing growth past 16)
        for _ in 0..17 {
            column.push_default();
        }

        // Then capacity has grown past the first 16-element allocation
        assert!(column.capacity >= 17);
        // And a never-written row reads back as zero
        let read = unsafe { *column.row_ptr(16).cast::<u64>() };
        assert_eq!(read, 0);
    }

    #[test]
    fn drop_runs_destructor_on_every_live_row() {
        // Given a column holding three drop-tracked rows
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut column = Column::new(info_for::<DropTracker>());
            for _ in 0..3 {
                let row = column.push_default();
                let value = DropTracker { counter: counter.clone() };
                unsafe { column.write_row(row, (&value as *const DropTracker).cast()) };
                std::mem::forget(value);
            }
            // When the column is dropped
        }

        // Then all three values were destructed
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn zero_sized_component_never_allocates() {
        // Given a column of a zero-sized type
        struct Marker;
        unsafe fn drop_marker(_ptr: *mut u8) {}
        let info = Info::for_test(Layout::new::<Marker>(), drop_marker);
        let mut column = Column::new(info);

        // When many rows are pushed
        for _ in 0..1000 {
            column.push_default();
        }

        // Then the column reports the right length without allocating bytes
        assert_eq!(column.len(), 1000);
    }
}
