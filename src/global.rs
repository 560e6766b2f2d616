//! Process-wide hook registry.
//!
//! A single [`HookEngine`] behind a spin lock, for callers that want the
//! classic free-function surface instead of owning an engine value. The
//! static lives for the whole process, so trampolines handed out here stay
//! valid until explicitly unhooked.

use core::ffi::c_void;

use spin::Mutex;

use crate::os::OsHal;
use crate::{HookEngine, Result};

static HOOKS: Mutex<HookEngine<OsHal>> = Mutex::new(HookEngine::new());

/// Installs an inline hook in the process-wide registry.
///
/// See [`HookEngine::install`] for semantics and failure modes.
///
/// # Safety
///
/// As for [`HookEngine::install`].
pub unsafe fn hook(target: *const c_void, detour: *const c_void) -> Result<*const c_void> {
    unsafe { HOOKS.lock().install(target, detour) }
}

/// Removes the process-wide hook at `target`, if any.
///
/// # Safety
///
/// As for [`HookEngine::uninstall`].
pub unsafe fn unhook(target: *const c_void) {
    unsafe { HOOKS.lock().uninstall(target) }
}

/// Removes every hook in the process-wide registry.
///
/// # Safety
///
/// As for [`HookEngine::uninstall_all`].
pub unsafe fn unhook_all() {
    unsafe { HOOKS.lock().uninstall_all() }
}
