//! Global keyboard hook installation
//!
//! Installs the single OS-level keyboard interception point for the
//! process and feeds every key transition into an [`InputHookService`].
//!
//! - macOS: a CGEventTap on a dedicated thread with its own CFRunLoop
//! - Windows: a `WH_KEYBOARD_LL` hook on a dedicated message-loop thread
//!
//! The hook thread lives until the process exits. Installation reports
//! back over a channel so failures surface to the caller instead of dying
//! on the hook thread.

use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::thread;

use tracing::{error, info};

use super::service::InputHookService;

/// Errors that can occur while installing the keyboard hook or building
/// a combination on top of it
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("a global keyboard hook is already installed in this process")]
    AlreadyInstalled,

    #[error("failed to install keyboard hook: {0}")]
    HookInstallation(String),

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("global keyboard hooks are not supported on {0}")]
    Unsupported(&'static str),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("hook thread exited before reporting installation")]
    HookThreadExited,

    #[error("a key combination needs at least one key")]
    EmptyCombination,
}

/// Proof that the OS hook is installed and running
#[derive(Debug, Clone)]
pub struct HookHandle {
    backend: &'static str,
    thread: thread::Thread,
}

impl HookHandle {
    /// Name of the OS mechanism in use
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// The thread on which the hook delivers events
    pub fn thread(&self) -> &thread::Thread {
        &self.thread
    }
}

type Ready = mpsc::SyncSender<Result<(), HotkeyError>>;

/// Install the process-wide keyboard hook and route its events to `service`
///
/// Blocks until the hook thread reports whether installation succeeded.
pub(crate) fn install_global_key_hook(
    service: Arc<InputHookService>,
) -> Result<HookHandle, HotkeyError> {
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    let join = thread::Builder::new()
        .name("keyboard-hook".to_string())
        .spawn(move || {
            info!("keyboard hook thread started");
            platform::run_hook(service, ready_tx);
            info!("keyboard hook thread stopped");
        })
        .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(HookHandle {
            backend: platform::BACKEND,
            thread: join.thread().clone(),
        }),
        Ok(Err(e)) => {
            error!(%e, "keyboard hook installation failed");
            Err(e)
        }
        Err(_) => Err(HotkeyError::HookThreadExited),
    }
}

/// Publish `service` to the slot a bare hook procedure reads from
///
/// The slot is only filled once `install` has succeeded, so a failed
/// attempt leaves it empty and may be retried.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn publish_after_install<H>(
    slot: &OnceLock<Arc<InputHookService>>,
    service: Arc<InputHookService>,
    install: impl FnOnce() -> Result<H, HotkeyError>,
    uninstall: impl FnOnce(H),
) -> Result<H, HotkeyError> {
    if slot.get().is_some() {
        return Err(HotkeyError::AlreadyInstalled);
    }

    let hook = install()?;
    if slot.set(service).is_err() {
        uninstall(hook);
        return Err(HotkeyError::AlreadyInstalled);
    }
    Ok(hook)
}

#[cfg(target_os = "macos")]
mod platform {
    use std::sync::Arc;

    use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventTapProxy, CGEventType, EventField,
    };
    use tracing::{error, info, warn};

    use super::{HotkeyError, Ready};
    use crate::hotkey::service::{InputHookService, KeyTransition, Suppress};

    pub(super) const BACKEND: &str = "CGEventTap";

    /// Device-dependent modifier bits (NX_DEVICE*KEYMASK) per keycode
    ///
    /// Caps Lock is left out: its flag reports the lock state, not whether
    /// the key is held, so it never produces a usable key-up.
    fn modifier_mask(keycode: u16) -> Option<u64> {
        match keycode {
            0x3B => Some(0x0000_0001), // left control
            0x38 => Some(0x0000_0002), // left shift
            0x3C => Some(0x0000_0004), // right shift
            0x37 => Some(0x0000_0008), // left command
            0x36 => Some(0x0000_0010), // right command
            0x3A => Some(0x0000_0020), // left option
            0x3D => Some(0x0000_0040), // right option
            0x3E => Some(0x0000_2000), // right control
            _ => None,
        }
    }

    fn keycode(event: &CGEvent) -> u16 {
        event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16
    }

    /// Modifiers only produce FlagsChanged; the direction comes from
    /// whether the key's own bit is still set
    fn modifier_transition(event: &CGEvent) -> Option<KeyTransition> {
        let mask = modifier_mask(keycode(event))?;
        if event.get_flags().bits() & mask != 0 {
            Some(KeyTransition::Down)
        } else {
            Some(KeyTransition::Up)
        }
    }

    /// The event handed back to the tap. Returning `None` from the
    /// callback keeps the original event, so a consumed event is turned
    /// into a null event instead.
    fn finish_event(event: &CGEvent, suppress: Suppress) -> Option<CGEvent> {
        if suppress.is_suppressed() {
            event.set_type(CGEventType::Null);
        }
        Some(event.clone())
    }

    pub(super) fn run_hook(service: Arc<InputHookService>, ready: Ready) {
        // CGEventTap callback - runs on this thread, must be fast and non-blocking
        let callback = move |_proxy: CGEventTapProxy,
                             event_type: CGEventType,
                             event: &CGEvent|
              -> Option<CGEvent> {
            let transition = match event_type {
                CGEventType::KeyDown => Some(KeyTransition::Down),
                CGEventType::KeyUp => Some(KeyTransition::Up),
                CGEventType::FlagsChanged => modifier_transition(event),
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                    warn!("event tap disabled by the system, key events may be missed");
                    None
                }
                _ => None,
            };

            let suppress = match transition {
                Some(transition) => service.dispatch_code(transition, u32::from(keycode(event))),
                None => Suppress::No,
            };

            finish_event(event, suppress)
        };

        let tap = match CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::Default,
            vec![CGEventType::KeyDown, CGEventType::KeyUp, CGEventType::FlagsChanged],
            callback,
        ) {
            Ok(tap) => tap,
            Err(()) => {
                error!("failed to create event tap - is Accessibility permission granted?");
                let _ = ready.send(Err(HotkeyError::EventTapCreation));
                return;
            }
        };

        let source = match tap.mach_port.create_runloop_source(0) {
            Ok(source) => source,
            Err(()) => {
                let _ = ready.send(Err(HotkeyError::HookInstallation(
                    "failed to create run loop source for event tap".to_string(),
                )));
                return;
            }
        };

        let run_loop = CFRunLoop::get_current();
        unsafe {
            run_loop.add_source(&source, kCFRunLoopCommonModes);
        }
        tap.enable();

        info!("event tap created and enabled");
        let _ = ready.send(Ok(()));

        // Only returns if the run loop is stopped
        CFRunLoop::run_current();
    }

}

// FFI type names match Win32 API conventions (HHOOK, MSG, etc.)
#[cfg(target_os = "windows")]
#[allow(clippy::upper_case_acronyms)]
mod platform {
    use std::ffi::c_int;
    use std::sync::{Arc, OnceLock};

    use tracing::info;

    use super::{publish_after_install, HotkeyError, Ready};
    use crate::hotkey::service::{InputHookService, KeyTransition};

    pub(super) const BACKEND: &str = "WH_KEYBOARD_LL";

    type HHOOK = isize;

    const WH_KEYBOARD_LL: c_int = 13;
    const WM_KEYDOWN: usize = 0x0100;
    const WM_KEYUP: usize = 0x0101;
    const WM_SYSKEYDOWN: usize = 0x0104;
    const WM_SYSKEYUP: usize = 0x0105;

    #[repr(C)]
    #[allow(dead_code)]
    struct KBDLLHOOKSTRUCT {
        vk_code: u32,
        scan_code: u32,
        flags: u32,
        time: u32,
        dw_extra_info: usize,
    }

    #[repr(C)]
    #[allow(dead_code)]
    struct POINT {
        x: i32,
        y: i32,
    }

    #[repr(C)]
    #[allow(dead_code)]
    struct MSG {
        hwnd: isize,
        message: u32,
        wparam: usize,
        lparam: isize,
        time: u32,
        pt: POINT,
    }

    #[link(name = "user32")]
    extern "system" {
        fn SetWindowsHookExW(
            id_hook: c_int,
            lpfn: unsafe extern "system" fn(c_int, usize, isize) -> isize,
            hmod: isize,
            dw_thread_id: u32,
        ) -> HHOOK;
        fn UnhookWindowsHookEx(hhk: HHOOK) -> i32;
        fn CallNextHookEx(hhk: HHOOK, n_code: c_int, wparam: usize, lparam: isize) -> isize;
        fn GetMessageW(msg: *mut MSG, hwnd: isize, msg_filter_min: u32, msg_filter_max: u32) -> i32;
        fn TranslateMessage(msg: *const MSG) -> i32;
        fn DispatchMessageW(msg: *const MSG) -> isize;
    }

    #[link(name = "kernel32")]
    extern "system" {
        fn GetModuleHandleW(module_name: *const u16) -> isize;
        fn GetLastError() -> u32;
    }

    /// The hook procedure is a bare function, so it reaches the service
    /// here. Filled only after the hook is installed; the procedure runs
    /// from this thread's message loop, which starts after that.
    static HOOK_SERVICE: OnceLock<Arc<InputHookService>> = OnceLock::new();

    unsafe extern "system" fn low_level_keyboard_proc(
        code: c_int,
        wparam: usize,
        lparam: isize,
    ) -> isize {
        if code >= 0 {
            let transition = match wparam {
                WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyTransition::Down),
                WM_KEYUP | WM_SYSKEYUP => Some(KeyTransition::Up),
                _ => None,
            };

            if let (Some(transition), Some(service)) = (transition, HOOK_SERVICE.get()) {
                let info = &*(lparam as *const KBDLLHOOKSTRUCT);
                if service.dispatch_code(transition, info.vk_code).is_suppressed() {
                    return 1;
                }
            }
        }

        CallNextHookEx(0, code, wparam, lparam)
    }

    pub(super) fn run_hook(service: Arc<InputHookService>, ready: Ready) {
        let installed = publish_after_install(
            &HOOK_SERVICE,
            service,
            || {
                let hook = unsafe {
                    let hmod = GetModuleHandleW(std::ptr::null());
                    SetWindowsHookExW(WH_KEYBOARD_LL, low_level_keyboard_proc, hmod, 0)
                };
                if hook == 0 {
                    let code = unsafe { GetLastError() };
                    return Err(HotkeyError::HookInstallation(format!(
                        "SetWindowsHookExW failed with error {code}"
                    )));
                }
                Ok(hook)
            },
            |hook| unsafe {
                UnhookWindowsHookEx(hook);
            },
        );
        let hook = match installed {
            Ok(hook) => hook,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        info!(handle = hook, "WH_KEYBOARD_LL installed");
        let _ = ready.send(Ok(()));

        // Low-level hooks are called through this thread's message loop
        let mut msg = MSG {
            hwnd: 0,
            message: 0,
            wparam: 0,
            lparam: 0,
            time: 0,
            pt: POINT { x: 0, y: 0 },
        };
        unsafe {
            while GetMessageW(&mut msg, 0, 0, 0) > 0 {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
mod platform {
    use std::sync::Arc;

    use super::{HotkeyError, Ready};
    use crate::hotkey::service::InputHookService;

    pub(super) const BACKEND: &str = "none";

    pub(super) fn run_hook(_service: Arc<InputHookService>, ready: Ready) {
        let _ = ready.send(Err(HotkeyError::Unsupported(std::env::consts::OS)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HotkeyError::EmptyCombination.to_string(),
            "a key combination needs at least one key"
        );
        assert!(HotkeyError::HookInstallation("denied".into())
            .to_string()
            .contains("denied"));
    }

    #[test]
    fn test_failed_install_can_be_retried() {
        let slot = OnceLock::new();
        let service = Arc::new(InputHookService::new());

        let first = publish_after_install(
            &slot,
            Arc::clone(&service),
            || Err::<u32, _>(HotkeyError::HookInstallation("denied".into())),
            |_| panic!("nothing to uninstall"),
        );
        assert!(matches!(first, Err(HotkeyError::HookInstallation(_))));
        assert!(slot.get().is_none());

        let second = publish_after_install(&slot, Arc::clone(&service), || Ok(7u32), |_| {});
        assert_eq!(second.unwrap(), 7);
        assert!(Arc::ptr_eq(slot.get().unwrap(), &service));
    }

    #[test]
    fn test_second_install_is_rejected_before_hooking() {
        let slot = OnceLock::new();
        let service = Arc::new(InputHookService::new());
        publish_after_install(&slot, Arc::clone(&service), || Ok(1u32), |_| {}).unwrap();

        let again = publish_after_install(
            &slot,
            service,
            || -> Result<u32, HotkeyError> { panic!("must not install a second hook") },
            |_| {},
        );
        assert!(matches!(again, Err(HotkeyError::AlreadyInstalled)));
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_unsupported_platform_reports_failure() {
        let result = install_global_key_hook(Arc::new(InputHookService::new()));
        assert!(matches!(result, Err(HotkeyError::Unsupported(_))));
    }
}
