//! Private growable heap for the large, short-lived buffers of one search.
//!
//! A handle-table snapshot can run to tens of megabytes and the object name
//! buffer is reallocated whenever the kernel asks for more room. Both live in
//! an [`Arena`] rather than the global allocator, and the whole heap is torn
//! down when the search finishes.
//!
//! Every [`ArenaBuf`] borrows the arena it came from, so a buffer can never
//! outlive its heap. Dropping a buffer frees it; dropping (or
//! [`destroy`](Arena::destroy)ing) the arena releases the heap itself.
//!
//! On Windows the heap is an `ntdll` `RtlCreateHeap` heap resolved at runtime.
//! Elsewhere a portable backend over `std::alloc` stands in so the search
//! engine can be exercised on any host.
use crate::error::ArenaError;
use std::cell::Cell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// A private heap owned by exactly one search.
pub struct Arena {
    heap: sys::Heap,
    /// Optional cap on outstanding bytes; `allocate` fails beyond it.
    limit: Option<usize>,
    live_blocks: Cell<usize>,
    live_bytes: Cell<usize>,
}

impl Arena {
    /// Create an unbounded arena.
    pub fn create() -> Result<Self, ArenaError> {
        Self::with_limit(None)
    }

    /// Create an arena that refuses allocations once `limit` bytes are live.
    pub fn with_limit(limit: Option<usize>) -> Result<Self, ArenaError> {
        let heap = sys::Heap::create()?;
        tracing::debug!("search arena created (limit: {limit:?})");
        Ok(Self {
            heap,
            limit,
            live_blocks: Cell::new(0),
            live_bytes: Cell::new(0),
        })
    }

    /// Allocate a zeroed block of `size` bytes.
    ///
    /// Returns `None` if the heap primitive is missing, the OS refuses the
    /// allocation, or the arena limit would be exceeded. Never panics.
    pub fn allocate(&self, size: usize) -> Option<ArenaBuf<'_>> {
        let size = size.max(1);
        let live = self.live_bytes.get();
        if let Some(limit) = self.limit {
            if live.saturating_add(size) > limit {
                tracing::debug!("arena limit reached: {live} live + {size} requested > {limit}");
                return None;
            }
        }

        let ptr = NonNull::new(self.heap.alloc(size))?;
        self.live_blocks.set(self.live_blocks.get() + 1);
        self.live_bytes.set(live + size);
        Some(ArenaBuf {
            arena: self,
            ptr,
            len: size,
        })
    }

    /// Return a block to the arena. A `None` block is ignored.
    pub fn free(&self, block: Option<ArenaBuf<'_>>) {
        drop(block);
    }

    /// Release the heap, reporting failure instead of only logging it.
    pub fn destroy(mut self) -> Result<(), ArenaError> {
        self.teardown()
    }

    /// Number of blocks currently handed out.
    pub fn live_blocks(&self) -> usize {
        self.live_blocks.get()
    }

    /// Bytes currently handed out.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    fn release(&self, ptr: NonNull<u8>, len: usize) {
        // SAFETY: `ptr` was returned by `self.heap.alloc(len)` and is released
        // exactly once, from `ArenaBuf::drop`.
        unsafe { self.heap.free(ptr.as_ptr(), len) };
        self.live_blocks.set(self.live_blocks.get() - 1);
        self.live_bytes.set(self.live_bytes.get() - len);
    }

    fn teardown(&mut self) -> Result<(), ArenaError> {
        if self.live_blocks.get() != 0 {
            tracing::warn!(
                "destroying search arena with {} live block(s)",
                self.live_blocks.get()
            );
        }
        self.heap.destroy()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::warn!("Could not release the search arena: {e}");
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("limit", &self.limit)
            .field("live_blocks", &self.live_blocks.get())
            .field("live_bytes", &self.live_bytes.get())
            .finish()
    }
}

/// A zeroed block borrowed from an [`Arena`]; freed on drop.
pub struct ArenaBuf<'a> {
    arena: &'a Arena,
    ptr: NonNull<u8>,
    len: usize,
}

impl ArenaBuf<'_> {
    /// Size of the block in bytes.
    pub fn capacity(&self) -> usize {
        self.len
    }
}

impl Deref for ArenaBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the block is `len` initialised (zeroed) bytes owned by this
        // value until drop.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for ArenaBuf<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for ArenaBuf<'_> {
    fn drop(&mut self) {
        self.arena.release(self.ptr, self.len);
    }
}

impl fmt::Debug for ArenaBuf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaBuf").field("len", &self.len).finish()
    }
}

// ── Backends ────────────────────────────────────────────────────────

#[cfg(windows)]
mod sys {
    use crate::error::ArenaError;
    use crate::platform::ntdll::{HeapApi, NtDll};
    use std::ffi::c_void;

    const HEAP_NO_SERIALIZE: u32 = 0x0000_0001;
    const HEAP_GROWABLE: u32 = 0x0000_0002;
    const HEAP_ZERO_MEMORY: u32 = 0x0000_0008;
    const RESERVE_SIZE: usize = 2 * 1024 * 1024;
    const COMMIT_SIZE: usize = 1024 * 1024;

    pub(super) struct Heap {
        api: HeapApi,
        handle: *mut c_void,
    }

    impl Heap {
        pub(super) fn create() -> Result<Self, ArenaError> {
            let api = NtDll::get().heap_api()?;
            // SAFETY: all pointer arguments are optional and passed as null.
            let handle = unsafe {
                (api.create)(
                    HEAP_NO_SERIALIZE | HEAP_GROWABLE,
                    std::ptr::null_mut(),
                    RESERVE_SIZE,
                    COMMIT_SIZE,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };
            if handle.is_null() {
                return Err(ArenaError::CreateFailed);
            }
            Ok(Self { api, handle })
        }

        pub(super) fn alloc(&self, size: usize) -> *mut u8 {
            if self.handle.is_null() {
                return std::ptr::null_mut();
            }
            // SAFETY: `handle` is a live heap created by `RtlCreateHeap`.
            unsafe { (self.api.allocate)(self.handle, HEAP_ZERO_MEMORY, size).cast() }
        }

        /// # Safety
        /// `ptr` must come from `alloc` on this heap and not be freed twice.
        pub(super) unsafe fn free(&self, ptr: *mut u8, _len: usize) {
            if !self.handle.is_null() {
                (self.api.free)(self.handle, 0, ptr.cast());
            }
        }

        pub(super) fn destroy(&mut self) -> Result<(), ArenaError> {
            if self.handle.is_null() {
                return Ok(());
            }
            // SAFETY: `handle` is live; `RtlDestroyHeap` returns null on success.
            let rest = unsafe { (self.api.destroy)(self.handle) };
            if rest.is_null() {
                self.handle = std::ptr::null_mut();
                Ok(())
            } else {
                Err(ArenaError::DestroyFailed)
            }
        }
    }
}

#[cfg(not(windows))]
mod sys {
    use crate::error::ArenaError;
    use std::alloc::{alloc_zeroed, dealloc, Layout};

    /// Matches the 16-byte `MEMORY_ALLOCATION_ALIGNMENT` of the NT heap.
    const ALIGN: usize = 16;

    pub(super) struct Heap {
        destroyed: bool,
    }

    impl Heap {
        pub(super) fn create() -> Result<Self, ArenaError> {
            Ok(Self { destroyed: false })
        }

        pub(super) fn alloc(&self, size: usize) -> *mut u8 {
            if self.destroyed {
                return std::ptr::null_mut();
            }
            match Layout::from_size_align(size, ALIGN) {
                // SAFETY: `size` is non-zero (clamped by `Arena::allocate`).
                Ok(layout) => unsafe { alloc_zeroed(layout) },
                Err(_) => std::ptr::null_mut(),
            }
        }

        /// # Safety
        /// `ptr` must come from `alloc(len)` on this heap and not be freed twice.
        pub(super) unsafe fn free(&self, ptr: *mut u8, len: usize) {
            if let Ok(layout) = Layout::from_size_align(len, ALIGN) {
                dealloc(ptr, layout);
            }
        }

        pub(super) fn destroy(&mut self) -> Result<(), ArenaError> {
            self.destroyed = true;
            Ok(())
        }
    }
}
