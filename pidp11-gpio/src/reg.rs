//! Bounds-checked volatile access to a mapped register block.

use std::ptr;

use crate::{Error, Result};

/// A window onto a memory-mapped GPIO register block.
///
/// Indices are in 32-bit words from the start of the window, and every
/// access is a single volatile word read or write. The window does not
/// own the mapping; whoever created it keeps it alive.
#[derive(Debug)]
pub struct RegisterWindow {
    base: *mut u32,
    words: usize,
}

impl RegisterWindow {
    /// Wrap a mapped register block.
    ///
    /// Fails with [`Error::InvalidBase`] if `base` is null or not
    /// word-aligned.
    ///
    /// # Safety
    ///
    /// `base` must point to a readable and writable region of at least
    /// `words` 32-bit words that remains mapped for the lifetime of the
    /// window, and nothing else may require exclusive access to it.
    pub unsafe fn new(base: *mut u32, words: usize) -> Result<Self> {
        if base.is_null() || !base.is_aligned() {
            return Err(Error::InvalidBase);
        }
        Ok(Self { base, words })
    }

    /// Number of words the window covers.
    pub fn words(&self) -> usize {
        self.words
    }

    /// Read the word at `index`.
    ///
    /// Panics if `index` is outside the window.
    #[inline]
    pub fn read(&self, index: usize) -> u32 {
        assert!(index < self.words, "register index {index} outside window");
        // Safety: `new` guarantees the region covers `words` words.
        unsafe { ptr::read_volatile(self.base.add(index)) }
    }

    /// Write `value` to the word at `index`.
    ///
    /// Panics if `index` is outside the window.
    #[inline]
    pub fn write(&self, index: usize, value: u32) {
        assert!(index < self.words, "register index {index} outside window");
        // Safety: `new` guarantees the region covers `words` words.
        unsafe { ptr::write_volatile(self.base.add(index), value) }
    }
}

// Safety: every access is a single volatile word read or write of a
// mapped register block, which the hardware serializes. Concurrent use
// can still interleave read-modify-write sequences; that is a device
// state hazard, not a memory safety one, and the scan engine serializes
// its accesses on one thread anyway.
unsafe impl Send for RegisterWindow {}
unsafe impl Sync for RegisterWindow {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_null_and_misaligned_bases() {
        let err = unsafe { RegisterWindow::new(ptr::null_mut(), 4) };
        assert_eq!(err.unwrap_err(), Error::InvalidBase);

        let mut backing = [0u32; 4];
        let skewed = (backing.as_mut_ptr() as usize + 1) as *mut u32;
        let err = unsafe { RegisterWindow::new(skewed, 4) };
        assert_eq!(err.unwrap_err(), Error::InvalidBase);
    }

    #[test]
    fn reads_and_writes_go_to_the_backing_words() {
        let mut backing = [0u32; 4];
        let window = unsafe { RegisterWindow::new(backing.as_mut_ptr(), 4) }.unwrap();
        window.write(2, 0xdead_beef);
        assert_eq!(window.read(2), 0xdead_beef);
        assert_eq!(backing[2], 0xdead_beef);
    }

    #[test]
    #[should_panic(expected = "outside window")]
    fn out_of_window_access_panics() {
        let mut backing = [0u32; 4];
        let window = unsafe { RegisterWindow::new(backing.as_mut_ptr(), 4) }.unwrap();
        window.read(4);
    }
}
