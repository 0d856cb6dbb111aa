use std::alloc::{self, handle_alloc_error, Layout};
use std::ptr;

/// Type erased vector of fixed-layout elements.
///
/// Elements are plain bytes to the column: they are inserted by pointer,
/// moved with bitwise copies, and removed with swap-remove. The column never
/// shrinks; capacity always grows to the next multiple of the configured
/// increment. Zero-sized layouts allocate nothing and keep a null base
/// pointer.
///
/// The column neither drops nor clones elements, so it is only suitable for
/// plain-old-data payloads.
pub struct Column {
    item_layout: Layout,
    data: *mut u8,
    len: usize,
    capacity: usize,
    increment: usize,
}

// SAFETY:
// - The column exclusively owns its allocation and elements are plain bytes
unsafe impl Send for Column {}
unsafe impl Sync for Column {}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("item_layout", &self.item_layout)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("increment", &self.increment)
            .finish()
    }
}

impl Column {
    /// Creates a column with room for `capacity` elements.
    ///
    /// `increment` is the granularity of every later growth step and must be
    /// non-zero.
    pub fn with_capacity(item_layout: Layout, capacity: usize, increment: usize) -> Self {
        assert!(increment > 0, "column increment must be non-zero");

        let item_layout = item_layout.pad_to_align();
        let mut column = Self {
            item_layout,
            data: ptr::null_mut(),
            len: 0,
            capacity,
            increment,
        };

        if item_layout.size() != 0 && capacity != 0 {
            let array_layout = column.array_layout(capacity);
            // SAFETY:
            // - `array_layout` has non-zero size
            let data = unsafe { alloc::alloc(array_layout) };
            if data.is_null() {
                handle_alloc_error(array_layout);
            }
            column.data = data;
        }

        column
    }

    #[inline]
    fn array_layout(&self, n: usize) -> Layout {
        let size = self
            .item_layout
            .size()
            .checked_mul(n)
            .expect("column capacity overflow");
        // SAFETY:
        // - alignment is valid, size is already padded to it
        unsafe { Layout::from_size_align_unchecked(size, self.item_layout.align()) }
    }

    /// Grows capacity to at least `capacity`, rounded up to the next multiple
    /// of the increment. Existing bytes are copied into the new allocation.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity <= self.capacity {
            return;
        }
        let increment = self.increment;
        let new_capacity = increment * ((capacity + increment - 1) / increment);
        let old_capacity = self.capacity;
        self.capacity = new_capacity;

        if self.item_layout.size() == 0 {
            return;
        }

        let array_layout = self.array_layout(new_capacity);
        // SAFETY:
        // - `array_layout` has non-zero size
        let data = unsafe { alloc::alloc(array_layout) };
        if data.is_null() {
            handle_alloc_error(array_layout);
        }

        if !self.data.is_null() {
            // SAFETY:
            // - old and new allocations are distinct
            // - `len * item_size` bytes are initialized in the old allocation
            unsafe {
                ptr::copy_nonoverlapping(self.data, data, self.len * self.item_layout.size());
                alloc::dealloc(self.data, self.array_layout(old_capacity));
            }
        }
        self.data = data;
    }

    /// Appends one element copied from `src` and returns its index.
    ///
    /// SAFETY:
    /// - `src` must point to at least `item_size` readable bytes
    #[inline]
    pub unsafe fn push_from(&mut self, src: *const u8) -> usize {
        if self.len == self.capacity {
            self.reserve(self.capacity + 1);
        }
        let index = self.len;
        self.len += 1;
        let size = self.item_layout.size();
        if size != 0 {
            ptr::copy_nonoverlapping(src, self.data.add(index * size), size);
        }
        index
    }

    /// Appends one zero-initialized element and returns its index.
    #[inline]
    pub fn push_zeroed(&mut self) -> usize {
        if self.len == self.capacity {
            self.reserve(self.capacity + 1);
        }
        let index = self.len;
        self.len += 1;
        self.zero(index);
        index
    }

    /// Overwrites the element at `index` with zero bytes.
    #[inline]
    pub fn zero(&mut self, index: usize) {
        assert!(index < self.len, "column index {index} out of bounds");
        let size = self.item_layout.size();
        if size != 0 {
            // SAFETY:
            // - `index` is in bounds, the row is `size` writable bytes
            unsafe { ptr::write_bytes(self.data.add(index * size), 0, size) };
        }
    }

    /// Pointer to the element at `index`, or null for zero-sized elements.
    #[inline]
    pub fn get(&self, index: usize) -> *mut u8 {
        assert!(index < self.len, "column index {index} out of bounds");
        let size = self.item_layout.size();
        if size == 0 {
            return ptr::null_mut();
        }
        // SAFETY:
        // - `index` is in bounds
        unsafe { self.data.add(index * size) }
    }

    /// Overwrites the element at `index` by the last element and shrinks the
    /// column by one. Returns whether an element actually moved, i.e. whether
    /// `index` was not the last row.
    pub fn swap_remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "column index {index} out of bounds");
        let last = self.len - 1;
        let size = self.item_layout.size();
        if index < last && size != 0 {
            // SAFETY:
            // - `index` and `last` are distinct in-bounds rows
            unsafe {
                ptr::copy_nonoverlapping(
                    self.data.add(last * size),
                    self.data.add(index * size),
                    size,
                );
            }
        }
        self.len = last;
        index < last
    }

    #[inline]
    pub fn base_ptr(&self) -> *mut u8 {
        self.data
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_layout.size()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        if !self.data.is_null() {
            // SAFETY:
            // - `data` was allocated with exactly this layout
            unsafe { alloc::dealloc(self.data, self.array_layout(self.capacity)) };
        }
    }
}
