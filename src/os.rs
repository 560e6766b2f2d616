//! Win32 virtual-memory backend.

use core::ffi::c_void;
use core::ptr;

use windows_sys::Win32::System::Memory::{
    MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_EXECUTE, PAGE_EXECUTE_READ,
    PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_NOACCESS, PAGE_PROTECTION_FLAGS,
    PAGE_READONLY, PAGE_READWRITE, PAGE_WRITECOPY, VirtualAlloc, VirtualFree, VirtualProtect,
};

use crate::{Hal, Protection};

/// [`Hal`] backend over `VirtualAlloc` / `VirtualProtect` / `VirtualFree`.
pub struct OsHal;

fn to_native(prot: Protection) -> PAGE_PROTECTION_FLAGS {
    match (
        prot.contains(Protection::WRITE),
        prot.contains(Protection::EXECUTE),
    ) {
        (false, false) => {
            if prot.contains(Protection::READ) {
                PAGE_READONLY
            } else {
                PAGE_NOACCESS
            }
        }
        (true, false) => PAGE_READWRITE,
        (false, true) => {
            if prot.contains(Protection::READ) {
                PAGE_EXECUTE_READ
            } else {
                PAGE_EXECUTE
            }
        }
        (true, true) => PAGE_EXECUTE_READWRITE,
    }
}

fn from_native(flags: PAGE_PROTECTION_FLAGS) -> Protection {
    // Modifier bits (guard, no-cache, write-combine) occupy the high byte
    // and are dropped; write-copy folds into read/write.
    match flags & 0xFF {
        PAGE_NOACCESS => Protection::empty(),
        PAGE_READONLY => Protection::READ,
        PAGE_READWRITE | PAGE_WRITECOPY => Protection::READ | Protection::WRITE,
        PAGE_EXECUTE => Protection::EXECUTE,
        PAGE_EXECUTE_READ => Protection::READ | Protection::EXECUTE,
        PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY => Protection::all(),
        _ => Protection::all(),
    }
}

impl Hal for OsHal {
    fn alloc_code(size: usize) -> Option<*mut u8> {
        let region = unsafe {
            VirtualAlloc(
                ptr::null(),
                size,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_EXECUTE_READWRITE,
            )
        };
        if region.is_null() {
            None
        } else {
            Some(region as *mut u8)
        }
    }

    unsafe fn dealloc_code(ptr: *mut u8, _size: usize) {
        unsafe { VirtualFree(ptr as *mut c_void, 0, MEM_RELEASE) };
    }

    unsafe fn protect(addr: *mut u8, size: usize, prot: Protection) -> Option<Protection> {
        let mut old: PAGE_PROTECTION_FLAGS = 0;
        let ok = unsafe { VirtualProtect(addr as *const c_void, size, to_native(prot), &mut old) };
        if ok != 0 { Some(from_native(old)) } else { None }
    }
}
