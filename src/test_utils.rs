//! Shared helpers for unit tests: heap-backed [`Hal`] implementations and
//! fake function bodies.

use alloc::alloc::{Layout, alloc, dealloc};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{Hal, Protection};

/// Size of a fake function body. Large enough that prologue measurement can
/// read a full decode window past any displaced range.
pub const BODY_LEN: usize = 64;

fn code_layout(size: usize) -> Layout {
    Layout::from_size_align(size.max(1), 16).unwrap()
}

/// Plain heap allocator standing in for the OS. Protection changes are
/// accepted and ignored; the heap is already writable, and the tests never
/// execute the patched bytes.
pub struct TestHal;

impl Hal for TestHal {
    fn alloc_code(size: usize) -> Option<*mut u8> {
        let ptr = unsafe { alloc(code_layout(size)) };
        if ptr.is_null() { None } else { Some(ptr) }
    }

    unsafe fn dealloc_code(ptr: *mut u8, size: usize) {
        unsafe { dealloc(ptr, code_layout(size)) }
    }

    unsafe fn protect(_addr: *mut u8, _size: usize, _prot: Protection) -> Option<Protection> {
        Some(Protection::READ | Protection::WRITE)
    }
}

/// Backend whose allocator is exhausted.
pub struct NoMemHal;

impl Hal for NoMemHal {
    fn alloc_code(_size: usize) -> Option<*mut u8> {
        None
    }

    unsafe fn dealloc_code(_ptr: *mut u8, _size: usize) {}

    unsafe fn protect(_addr: *mut u8, _size: usize, _prot: Protection) -> Option<Protection> {
        Some(Protection::READ | Protection::WRITE)
    }
}

/// Backend that refuses every protection change.
pub struct NoProtectHal;

impl Hal for NoProtectHal {
    fn alloc_code(size: usize) -> Option<*mut u8> {
        TestHal::alloc_code(size)
    }

    unsafe fn dealloc_code(ptr: *mut u8, size: usize) {
        unsafe { TestHal::dealloc_code(ptr, size) }
    }

    unsafe fn protect(_addr: *mut u8, _size: usize, _prot: Protection) -> Option<Protection> {
        None
    }
}

// Install and restore each bracket the target with two protection changes
// (make-writable, then put the old protection back); a restore that fails
// its first change makes no second one. The counting backends below rely on
// that call pattern. Each one is owned by a single test, so its counter is
// never shared.

/// Backend whose protection changes succeed for one install (two calls) and
/// fail from then on: every later restore attempt is refused.
pub struct TeardownFailHal;

static TEARDOWN_FAIL_CALLS: AtomicUsize = AtomicUsize::new(0);

impl Hal for TeardownFailHal {
    fn alloc_code(size: usize) -> Option<*mut u8> {
        TestHal::alloc_code(size)
    }

    unsafe fn dealloc_code(ptr: *mut u8, size: usize) {
        unsafe { TestHal::dealloc_code(ptr, size) }
    }

    unsafe fn protect(_addr: *mut u8, _size: usize, _prot: Protection) -> Option<Protection> {
        if TEARDOWN_FAIL_CALLS.fetch_add(1, Ordering::SeqCst) < 2 {
            Some(Protection::READ | Protection::WRITE)
        } else {
            None
        }
    }
}

/// Backend for a two-hook teardown where only the first restore fails: calls
/// 0-3 (two installs) succeed, call 4 (first restore attempt) is refused,
/// and everything after succeeds again.
pub struct PartialTeardownHal;

static PARTIAL_TEARDOWN_CALLS: AtomicUsize = AtomicUsize::new(0);

impl Hal for PartialTeardownHal {
    fn alloc_code(size: usize) -> Option<*mut u8> {
        TestHal::alloc_code(size)
    }

    unsafe fn dealloc_code(ptr: *mut u8, size: usize) {
        unsafe { TestHal::dealloc_code(ptr, size) }
    }

    unsafe fn protect(_addr: *mut u8, _size: usize, _prot: Protection) -> Option<Protection> {
        if PARTIAL_TEARDOWN_CALLS.fetch_add(1, Ordering::SeqCst) == 4 {
            None
        } else {
            Some(Protection::READ | Protection::WRITE)
        }
    }
}

/// Builds a fake function body: `prologue` followed by RET padding up to
/// [`BODY_LEN`] bytes.
pub fn code_body(prologue: &[u8]) -> Vec<u8> {
    assert!(prologue.len() <= BODY_LEN);
    let mut body = prologue.to_vec();
    body.resize(BODY_LEN, 0xC3);
    body
}
