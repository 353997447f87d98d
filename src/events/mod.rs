//! Events module for shortcut notifications
//!
//! Structured events emitted by the daemon, and the bridge that carries a
//! fired combination from the hook thread into async code.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hotkey::Key;

/// Events emitted while shortcuts are registered and used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShortcutEvent {
    /// The global keyboard hook is in place
    HookInstalled {
        /// OS mechanism backing the hook
        backend: String,
    },

    /// A shortcut is being tracked
    ShortcutRegistered {
        name: String,
        keys: Vec<Key>,
    },

    /// A shortcut's full combination was held and one key released
    ShortcutFired {
        name: String,
    },

    /// A shortcut stopped being tracked
    ShortcutDisposed {
        name: String,
    },
}

impl std::fmt::Display for ShortcutEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortcutEvent::HookInstalled { backend } => write!(f, "HOOK_INSTALLED ({})", backend),
            ShortcutEvent::ShortcutRegistered { name, keys } => {
                let keys: Vec<String> = keys.iter().map(Key::to_string).collect();
                write!(f, "SHORTCUT_REGISTERED {} ({})", name, keys.join("+"))
            }
            ShortcutEvent::ShortcutFired { name } => write!(f, "SHORTCUT_FIRED {}", name),
            ShortcutEvent::ShortcutDisposed { name } => write!(f, "SHORTCUT_DISPOSED {}", name),
        }
    }
}

/// Build a fired callback that forwards `ShortcutFired { name }` into `tx`
///
/// The callback never blocks the hook thread: when the channel is full the
/// event is dropped with a warning.
pub fn fired_notifier(
    tx: mpsc::Sender<ShortcutEvent>,
    name: impl Into<String>,
) -> impl Fn() + Send + Sync + 'static {
    let name = name.into();
    move || {
        let event = ShortcutEvent::ShortcutFired { name: name.clone() };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(%event, "event channel full, dropping fired shortcut");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(name = %name, "event channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ShortcutEvent::ShortcutRegistered {
            name: "launcher".to_string(),
            keys: vec![Key::LeftControl, Key::Space],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("shortcut_registered"));
        assert!(json.contains("\"LeftControl\""));
        assert!(json.contains("launcher"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"shortcut_fired","name":"launcher"}"#;
        let event: ShortcutEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ShortcutEvent::ShortcutFired {
                name: "launcher".to_string()
            }
        );
    }

    #[test]
    fn test_display() {
        let event = ShortcutEvent::ShortcutRegistered {
            name: "copy".to_string(),
            keys: vec![Key::LeftControl, Key::C],
        };
        assert_eq!(event.to_string(), "SHORTCUT_REGISTERED copy (LeftControl+C)");
    }

    #[test]
    fn test_notifier_forwards_fired_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let notify = fired_notifier(tx, "launcher");

        notify();
        notify();

        let first = tokio_test::block_on(rx.recv());
        assert_eq!(
            first,
            Some(ShortcutEvent::ShortcutFired {
                name: "launcher".to_string()
            })
        );
        assert!(tokio_test::block_on(rx.recv()).is_some());
    }

    #[test]
    fn test_notifier_drops_when_full_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let notify = fired_notifier(tx, "busy");

        notify();
        notify();
        notify();

        assert!(tokio_test::block_on(rx.recv()).is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notifier_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let notify = fired_notifier(tx, "gone");
        drop(rx);
        notify();
    }
}
