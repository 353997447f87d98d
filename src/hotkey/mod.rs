//! Hotkey module for global keyboard event listening
//!
//! One OS-level keyboard hook per process feeds an [`InputHookService`],
//! which fans every key transition out to any number of
//! [`CombinationTracker`]s.

mod keys;
mod listener;
mod service;
mod tracker;

pub use keys::{parse_combination, Key, KeyParseError};
pub use listener::{HookHandle, HotkeyError};
pub use service::{
    InputHookService, KeyHandler, KeyTransition, RawKeyEvent, SubscriberId, Subscription, Suppress,
};
pub use tracker::{CombinationTracker, TrackerOptions};
