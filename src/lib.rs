//! global-shortcuts: system-wide key combination detection
//!
//! A single low-level keyboard hook per process (CGEventTap on macOS,
//! `WH_KEYBOARD_LL` on Windows) feeds an [`InputHookService`]. Each
//! [`CombinationTracker`] subscribes to it and reports when its whole
//! combination was held and one of its keys released.
//!
//! ```no_run
//! use global_shortcuts::{CombinationTracker, InputHookService, Key};
//!
//! # fn main() -> Result<(), global_shortcuts::HotkeyError> {
//! let service = InputHookService::global()?;
//! let tracker = CombinationTracker::new(
//!     &service,
//!     vec![Key::LeftControl, Key::LeftShift, Key::K],
//!     || println!("fired"),
//! )?;
//! // ...
//! tracker.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! Fired callbacks run on the hook thread and stall keyboard input for the
//! whole system until they return. Keep them short and non-blocking.

pub mod config;
pub mod events;
pub mod hotkey;
pub mod lifecycle;
pub mod state;

pub use hotkey::{
    parse_combination, CombinationTracker, HookHandle, HotkeyError, InputHookService, Key,
    KeyParseError, KeyTransition, RawKeyEvent, SubscriberId, Subscription, Suppress,
    TrackerOptions,
};
pub use state::ComboState;
