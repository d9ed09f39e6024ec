use std::alloc::{self, Layout};
use std::ffi::c_void;
use std::ptr::{self, NonNull};

use log::{debug, warn};
use rustc_hash::FxHashMap;

const BLOCK_ALIGN: usize = 16;

/// Zeroed heap block owned by the store.
struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Block {
    fn zeroed(size: usize) -> Option<Self> {
        let layout = Layout::from_size_align(size, BLOCK_ALIGN).ok()?;
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(raw).map(|ptr| Self { ptr, layout })
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

enum Slot {
    /// Pointer handed in by an extension; never dereferenced or freed here.
    Borrowed(*mut c_void),
    Owned(Block),
}

impl Slot {
    fn ptr(&self) -> *mut c_void {
        match self {
            Slot::Borrowed(ptr) => *ptr,
            Slot::Owned(block) => block.ptr.as_ptr().cast(),
        }
    }
}

/// Named pointers shared between extension modules.
///
/// Lives on the thread that owns the bridge; pointers are opaque to it.
#[derive(Default)]
pub struct GlobalMemory {
    slots: FxHashMap<String, Slot>,
}

impl GlobalMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer stored under `name`, null when there is none.
    pub fn get_pointer(&self, name: &str) -> *mut c_void {
        self.slots.get(name).map_or(ptr::null_mut(), Slot::ptr)
    }

    /// Store `pointer` under `name`. Returns the pointer it replaced, or
    /// `pointer` itself when the name was free. Names backed by an
    /// allocation from [`GlobalMemory::allocate`] are left alone and null
    /// is returned.
    pub fn set_pointer(&mut self, name: &str, pointer: *mut c_void) -> *mut c_void {
        match self.slots.get_mut(name) {
            Some(Slot::Owned(_)) => {
                warn!("global memory `{name}` is an owned allocation, free it first");
                ptr::null_mut()
            }
            Some(Slot::Borrowed(previous)) => std::mem::replace(previous, pointer),
            None => {
                self.slots.insert(name.to_string(), Slot::Borrowed(pointer));
                pointer
            }
        }
    }

    /// Forget `name`. Owned allocations under it are freed.
    pub fn delete_pointer(&mut self, name: &str) -> bool {
        self.slots.remove(name).is_some()
    }

    /// Zeroed block of `size` bytes owned by the store, published under
    /// `name`. An existing entry is returned as-is; a zero size yields null.
    pub fn allocate(&mut self, name: &str, size: usize) -> *mut c_void {
        if let Some(slot) = self.slots.get(name) {
            debug!("global memory `{name}` already exists, reusing it");
            return slot.ptr();
        }
        match Block::zeroed(size) {
            Some(block) => {
                let slot = Slot::Owned(block);
                let ptr = slot.ptr();
                self.slots.insert(name.to_string(), slot);
                ptr
            }
            None => ptr::null_mut(),
        }
    }

    /// Release a block made by [`GlobalMemory::allocate`]. Borrowed
    /// pointers are not touched.
    pub fn free(&mut self, name: &str) -> bool {
        if matches!(self.slots.get(name), Some(Slot::Owned(_))) {
            self.slots.remove(name);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_returns_new_then_previous() {
        let mut memory = GlobalMemory::new();
        let mut a = 1_u32;
        let mut b = 2_u32;
        let pa: *mut c_void = (&mut a as *mut u32).cast();
        let pb: *mut c_void = (&mut b as *mut u32).cast();

        assert!(memory.get_pointer("score").is_null());
        assert_eq!(memory.set_pointer("score", pa), pa);
        assert_eq!(memory.set_pointer("score", pb), pa);
        assert_eq!(memory.get_pointer("score"), pb);

        assert!(memory.delete_pointer("score"));
        assert!(!memory.delete_pointer("score"));
        assert!(memory.get_pointer("score").is_null());
    }

    #[test]
    fn allocations_are_zeroed_and_reused() {
        let mut memory = GlobalMemory::new();
        let block = memory.allocate("buffer", 64);
        assert!(!block.is_null());
        assert_eq!(block as usize % BLOCK_ALIGN, 0);

        let bytes = unsafe { std::slice::from_raw_parts(block.cast::<u8>(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));

        assert_eq!(memory.allocate("buffer", 128), block);
        assert_eq!(memory.get_pointer("buffer"), block);
        assert!(memory.set_pointer("buffer", ptr::null_mut()).is_null());
        assert_eq!(memory.get_pointer("buffer"), block);

        assert!(memory.free("buffer"));
        assert!(!memory.free("buffer"));
        assert!(memory.is_empty());
    }

    #[test]
    fn free_ignores_borrowed_pointers() {
        let mut memory = GlobalMemory::new();
        let mut value = 5_i64;
        memory.set_pointer("value", (&mut value as *mut i64).cast());
        assert!(!memory.free("value"));
        assert_eq!(memory.len(), 1);
        assert!(memory.allocate("empty", 0).is_null());
    }

    #[test]
    fn every_name_gets_its_own_slot() {
        let mut memory = GlobalMemory::new();
        let blocks: Vec<_> = (0..512)
            .map(|i| memory.allocate(&format!("slot_{i}"), 8))
            .collect();
        assert_eq!(memory.len(), 512);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(memory.get_pointer(&format!("slot_{i}")), *block);
        }
        assert!(memory.get_pointer("slot_512").is_null());
    }
}
