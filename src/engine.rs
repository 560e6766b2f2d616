//! Hook installation, tracking, and removal.
//!
//! An installed hook displaces the smallest run of whole instructions at the
//! target that covers the detour jump, re-hosts those bytes in an executable
//! trampoline, and overwrites them with the jump. The registry maps target
//! addresses to their [`Hook`] records and exclusively owns the trampolines.

use alloc::collections::BTreeMap;
use core::ffi::c_void;
use core::{ptr, slice};

use crate::frame::ExecFrame;
use crate::length_decoder::{MAX_INSTRUCTION_LENGTH, instruction_length};
use crate::{Hal, HookError, Protection, Result};

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        /// Bytes a detour jump occupies: `MOV RAX, imm64; JMP RAX`.
        pub const MIN_HOOK_SIZE: usize = 12;

        /// Builds an unconditional jump to `dest` for placement at `_at`.
        fn jump_stub(_at: usize, dest: usize) -> [u8; MIN_HOOK_SIZE] {
            let mut stub = [0u8; MIN_HOOK_SIZE];
            // MOV RAX, dest
            stub[0] = 0x48;
            stub[1] = 0xB8;
            stub[2..10].copy_from_slice(&(dest as u64).to_le_bytes());
            // JMP RAX
            stub[10] = 0xFF;
            stub[11] = 0xE0;
            stub
        }
    } else {
        /// Bytes a detour jump occupies: `JMP rel32`.
        pub const MIN_HOOK_SIZE: usize = 5;

        /// Builds an unconditional jump to `dest` for placement at `at`.
        fn jump_stub(at: usize, dest: usize) -> [u8; MIN_HOOK_SIZE] {
            let mut stub = [0u8; MIN_HOOK_SIZE];
            // JMP rel32, displacement relative to the byte after the jump
            stub[0] = 0xE9;
            let disp = (dest as u32).wrapping_sub(at as u32 + MIN_HOOK_SIZE as u32);
            stub[1..5].copy_from_slice(&disp.to_le_bytes());
            stub
        }
    }
}

/// A single installed hook.
///
/// The trampoline layout is `[displaced prologue bytes | jump back to
/// target + displaced_len]`; its first `displaced_len` bytes double as the
/// backup used to restore the target on removal.
#[derive(Debug)]
pub struct Hook<H: Hal> {
    trampoline: ExecFrame<H>,
    displaced_len: usize,
}

impl<H: Hal> Hook<H> {
    /// Entry point that runs the original prologue and resumes the target.
    pub fn trampoline(&self) -> *const u8 {
        self.trampoline.as_ptr()
    }

    /// Number of prologue bytes overwritten at the target.
    pub fn displaced_len(&self) -> usize {
        self.displaced_len
    }

    /// Total trampoline size: the displaced bytes plus the jump-back stub.
    pub fn trampoline_size(&self) -> usize {
        self.trampoline.size()
    }
}

/// A set of installed hooks over one [`Hal`] backend.
///
/// This is the primary API; the crate-level `hook`/`unhook` functions wrap a
/// process-wide instance of it. Operations take `&mut self`, so a
/// single engine value cannot be raced from safe code; serialization against
/// threads executing the *targets* remains the caller's responsibility.
pub struct HookEngine<H: Hal> {
    hooks: BTreeMap<usize, Hook<H>>,
}

impl<H: Hal> HookEngine<H> {
    /// Creates an engine with no installed hooks.
    pub const fn new() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    /// Installs an inline hook redirecting `target` to `detour`.
    ///
    /// On success returns the trampoline entry point: calling it executes the
    /// displaced prologue and resumes the target. The pointer borrows memory
    /// owned by the registry and is invalidated by
    /// [`uninstall`](Self::uninstall).
    ///
    /// # Safety
    ///
    /// * `target` must be the first byte of a function whose code stays
    ///   mapped and readable for at least the displaced prologue plus
    ///   [`MAX_INSTRUCTION_LENGTH`] bytes.
    /// * `detour` must be callable with the target's ABI.
    /// * No thread may execute `[target, target + displaced bytes)` while the
    ///   patch is being written; the write is neither atomic nor fenced.
    pub unsafe fn install(
        &mut self,
        target: *const c_void,
        detour: *const c_void,
    ) -> Result<*const c_void> {
        if target.is_null() || detour.is_null() {
            return Err(HookError::NullArgument);
        }
        let target_addr = target as usize;
        if self.hooks.contains_key(&target_addr) {
            return Err(HookError::AlreadyHooked);
        }

        let displaced_len = unsafe { measure_prologue(target as *const u8)? };

        let trampoline = ExecFrame::<H>::alloc(displaced_len + MIN_HOOK_SIZE)?;
        unsafe {
            ptr::copy_nonoverlapping(target as *const u8, trampoline.as_mut_ptr(), displaced_len);
            let jump_back = trampoline.as_mut_ptr().add(displaced_len);
            let stub = jump_stub(jump_back as usize, target_addr + displaced_len);
            ptr::copy_nonoverlapping(stub.as_ptr(), jump_back, MIN_HOOK_SIZE);
        }

        // Failing here drops the trampoline; the target has not been touched.
        let old = unsafe { H::protect(target as *mut u8, displaced_len, Protection::all()) }
            .ok_or(HookError::ProtectionFailed)?;
        unsafe {
            ptr::write_bytes(target as *mut u8, 0x90, displaced_len);
            let patch = jump_stub(target_addr, detour as usize);
            ptr::copy_nonoverlapping(patch.as_ptr(), target as *mut u8, MIN_HOOK_SIZE);
            H::protect(target as *mut u8, displaced_len, old);
        }

        let entry = trampoline.as_ptr() as *const c_void;
        debug!(
            "hooked {:#x} -> {:#x}, {} bytes displaced to {:#x}",
            target_addr, detour as usize, displaced_len, entry as usize
        );
        self.hooks.insert(
            target_addr,
            Hook {
                trampoline,
                displaced_len,
            },
        );
        Ok(entry)
    }

    /// Removes the hook at `target`, restoring the original prologue bytes
    /// and releasing the trampoline. Does nothing if `target` is null or not
    /// hooked.
    ///
    /// # Safety
    ///
    /// No thread may execute the patched region or the trampoline during or
    /// after the call.
    pub unsafe fn uninstall(&mut self, target: *const c_void) {
        if target.is_null() {
            return;
        }
        let target_addr = target as usize;
        let Some(hook) = self.hooks.remove(&target_addr) else {
            return;
        };
        if !unsafe { restore_prologue::<H>(target_addr, &hook) } {
            // Leaving the hook registered keeps the trampoline alive; the
            // target still jumps through it.
            self.hooks.insert(target_addr, hook);
        }
    }

    /// Removes every installed hook, best-effort: a failure on one target
    /// never skips the others.
    ///
    /// # Safety
    ///
    /// As for [`uninstall`](Self::uninstall), for every hooked target.
    pub unsafe fn uninstall_all(&mut self) {
        for (target_addr, hook) in core::mem::take(&mut self.hooks) {
            if !unsafe { restore_prologue::<H>(target_addr, &hook) } {
                self.hooks.insert(target_addr, hook);
            }
        }
    }

    /// Whether `target` currently has a hook installed.
    pub fn is_hooked(&self, target: *const c_void) -> bool {
        self.hooks.contains_key(&(target as usize))
    }

    /// The hook record for `target`, if installed.
    pub fn hook(&self, target: *const c_void) -> Option<&Hook<H>> {
        self.hooks.get(&(target as usize))
    }

    /// Number of installed hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl<H: Hal> Default for HookEngine<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Hal> Drop for HookEngine<H> {
    fn drop(&mut self) {
        // Dropping trampolines that patched targets still jump into would
        // leave live code pointing at freed pages; restore everything first.
        unsafe { self.uninstall_all() };
    }
}

/// Walks instruction boundaries at `target` until the accumulated length
/// covers a detour jump.
unsafe fn measure_prologue(target: *const u8) -> Result<usize> {
    let mut len = 0;
    while len < MIN_HOOK_SIZE {
        let window = unsafe { slice::from_raw_parts(target.add(len), MAX_INSTRUCTION_LENGTH) };
        len += instruction_length(window)?;
    }
    Ok(len)
}

/// Copies the displaced bytes back over the target. Returns `false` when the
/// prologue could not be made writable, leaving the target untouched.
unsafe fn restore_prologue<H: Hal>(target_addr: usize, hook: &Hook<H>) -> bool {
    let target = target_addr as *mut u8;
    let len = hook.displaced_len;
    let Some(old) = (unsafe { H::protect(target, len, Protection::all()) }) else {
        warn!("unhook of {target_addr:#x} failed: prologue not writable");
        return false;
    };
    unsafe {
        ptr::copy_nonoverlapping(hook.trampoline.as_ptr(), target, len);
        H::protect(target, len, old);
    }
    debug!("unhooked {target_addr:#x}, {len} bytes restored");
    true
}
