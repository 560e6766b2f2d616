#![cfg_attr(not(test), no_std)]
#![cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#![doc = include_str!("../README.md")]

#[macro_use]
extern crate log;

extern crate alloc;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

mod engine;
mod frame;
mod length_decoder;
mod opcodes;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod global;
        mod os;

        pub use global::{hook, unhook, unhook_all};
        pub use os::OsHal;
    }
}

pub use engine::{Hook, HookEngine, MIN_HOOK_SIZE};
pub use frame::ExecFrame;
pub use length_decoder::{MAX_INSTRUCTION_LENGTH, ModRm, RexPrefix, instruction_length};
pub use opcodes::{ImmSize, OPCODES, OpcodeInfo, OpcodeKind};

use core::fmt;

/// Ways a hook operation can fail.
///
/// All failures are recoverable; the target and the registry are left
/// untouched by a failed [`HookEngine::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookError {
    /// The target or detour pointer was null.
    NullArgument,
    /// The target already has a hook installed.
    AlreadyHooked,
    /// The target prologue contains an instruction the length decoder does
    /// not cover.
    UndecodableOpcode,
    /// The backend could not allocate an executable trampoline region.
    AllocationFailed,
    /// The backend could not make the target prologue writable.
    ProtectionFailed,
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullArgument => write!(f, "target or detour pointer is null"),
            Self::AlreadyHooked => write!(f, "target is already hooked"),
            Self::UndecodableOpcode => write!(f, "undecodable opcode in target prologue"),
            Self::AllocationFailed => write!(f, "trampoline allocation failed"),
            Self::ProtectionFailed => write!(f, "page protection change failed"),
        }
    }
}

impl core::error::Error for HookError {}

pub type Result<T> = core::result::Result<T, HookError>;

bitflags::bitflags! {
    /// Page permissions understood by a [`Hal`] backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protection: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

/// Host abstraction for executable memory management.
///
/// The engine needs exactly three primitives from the host: reserve-and-commit
/// an executable region, change the protection of a page range, and free a
/// previously allocated region. [`OsHal`] provides them on Windows; tests
/// supply heap-backed implementations.
pub trait Hal {
    /// Allocates a readable, writable, executable region of at least `size`
    /// bytes.
    ///
    /// # Returns
    ///
    /// * `Option<*mut u8>` - Some containing the region start, or None if
    ///   allocation fails. The region is page-granular and owned by the
    ///   caller until passed to [`Hal::dealloc_code`].
    fn alloc_code(size: usize) -> Option<*mut u8>;

    /// Releases a region previously returned by [`Hal::alloc_code`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Hal::alloc_code`] with the same `size`, and
    /// must not be used afterwards.
    unsafe fn dealloc_code(ptr: *mut u8, size: usize);

    /// Changes the protection of the pages covering `[addr, addr + size)`.
    ///
    /// # Returns
    ///
    /// * `Option<Protection>` - Some containing the previous protection (to
    ///   be passed back for restoration), or None if the change failed.
    ///
    /// # Safety
    ///
    /// `addr..addr + size` must lie within a mapped region of the process.
    unsafe fn protect(addr: *mut u8, size: usize, prot: Protection) -> Option<Protection>;
}
