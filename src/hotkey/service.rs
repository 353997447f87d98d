//! Process-wide keyboard event fan-out
//!
//! [`InputHookService`] owns two observer lists, one for key-down and one
//! for key-up. The platform hook calls [`InputHookService::dispatch`] once
//! per key transition; every subscriber of the matching list runs in
//! subscription order and the returned [`Suppress`] decisions are OR-ed.
//!
//! The lists are locked only while they are mutated or copied. Dispatch
//! iterates a snapshot, so a subscriber may subscribe or unsubscribe
//! anything (itself included) while an event is being delivered.
//!
//! Subscribers run on the hook thread and hold up system-wide input while
//! they run. They must not block.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use super::keys::Key;
use super::listener::{self, HookHandle, HotkeyError};

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTransition {
    Down,
    Up,
}

/// One decoded key transition, valid for a single dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub key: Key,
    pub transition: KeyTransition,
}

/// Whether an event should be kept from the rest of the system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Suppress {
    /// Forward the event down the hook chain
    #[default]
    No,
    /// Consume the event
    Yes,
}

impl Suppress {
    pub fn is_suppressed(self) -> bool {
        self == Suppress::Yes
    }
}

impl From<bool> for Suppress {
    fn from(suppress: bool) -> Self {
        if suppress {
            Suppress::Yes
        } else {
            Suppress::No
        }
    }
}

impl BitOr for Suppress {
    type Output = Suppress;

    fn bitor(self, rhs: Suppress) -> Suppress {
        Suppress::from(self.is_suppressed() || rhs.is_suppressed())
    }
}

impl BitOrAssign for Suppress {
    fn bitor_assign(&mut self, rhs: Suppress) {
        *self = *self | rhs;
    }
}

/// Callback run for every event on one channel
pub type KeyHandler = Arc<dyn Fn(&RawKeyEvent) -> Suppress + Send + Sync>;

/// Identifies one handler on one channel. Ids grow monotonically, so
/// ordering by id is subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A paired key-down/key-up subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub key_down: SubscriberId,
    pub key_up: SubscriberId,
}

/// Handlers of one channel, keyed by subscription order
#[derive(Default)]
struct ObserverList {
    handlers: Mutex<BTreeMap<SubscriberId, KeyHandler>>,
}

impl ObserverList {
    fn insert(&self, id: SubscriberId, handler: KeyHandler) {
        self.handlers.lock().insert(id, handler);
    }

    fn remove(&self, id: SubscriberId) -> bool {
        self.handlers.lock().remove(&id).is_some()
    }

    fn snapshot(&self) -> Vec<KeyHandler> {
        self.handlers.lock().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.handlers.lock().len()
    }
}

static GLOBAL: Mutex<Option<Arc<InputHookService>>> = parking_lot::const_mutex(None);

/// Fan-out point between one keyboard hook and any number of subscribers
#[derive(Default)]
pub struct InputHookService {
    key_down: ObserverList,
    key_up: ObserverList,
    next_id: AtomicU64,
    hook: OnceLock<HookHandle>,
}

impl InputHookService {
    /// Create a service with no OS hook attached
    ///
    /// Events only arrive through [`dispatch`](Self::dispatch). Useful for
    /// feeding synthetic events, e.g. in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide service, installing the OS keyboard hook on first use
    ///
    /// Exactly one hook is installed per process. A failed installation is
    /// returned to the caller and not remembered, so calling again retries.
    pub fn global() -> Result<Arc<Self>, HotkeyError> {
        let mut slot = GLOBAL.lock();
        if let Some(service) = slot.as_ref() {
            return Ok(Arc::clone(service));
        }

        let service = Arc::new(Self::new());
        let handle = listener::install_global_key_hook(Arc::clone(&service))?;
        info!(backend = handle.backend(), "global keyboard hook installed");
        let _ = service.hook.set(handle);

        *slot = Some(Arc::clone(&service));
        Ok(service)
    }

    /// The OS hook feeding this service, if any
    pub fn hook(&self) -> Option<&HookHandle> {
        self.hook.get()
    }

    /// Subscribe a key-down and a key-up handler together
    pub fn subscribe<D, U>(&self, on_down: D, on_up: U) -> Subscription
    where
        D: Fn(&RawKeyEvent) -> Suppress + Send + Sync + 'static,
        U: Fn(&RawKeyEvent) -> Suppress + Send + Sync + 'static,
    {
        Subscription {
            key_down: self.subscribe_key_down(on_down),
            key_up: self.subscribe_key_up(on_up),
        }
    }

    /// Remove both halves of a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.unsubscribe_key_down(subscription.key_down);
        self.unsubscribe_key_up(subscription.key_up);
    }

    pub fn subscribe_key_down<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&RawKeyEvent) -> Suppress + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.key_down.insert(id, Arc::new(handler));
        debug!(subscriber = %id, "key-down subscriber added");
        id
    }

    pub fn subscribe_key_up<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&RawKeyEvent) -> Suppress + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.key_up.insert(id, Arc::new(handler));
        debug!(subscriber = %id, "key-up subscriber added");
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe_key_down(&self, id: SubscriberId) -> bool {
        let removed = self.key_down.remove(id);
        if removed {
            debug!(subscriber = %id, "key-down subscriber removed");
        }
        removed
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe_key_up(&self, id: SubscriberId) -> bool {
        let removed = self.key_up.remove(id);
        if removed {
            debug!(subscriber = %id, "key-up subscriber removed");
        }
        removed
    }

    /// Number of (key-down, key-up) subscribers
    pub fn subscriber_count(&self) -> (usize, usize) {
        (self.key_down.len(), self.key_up.len())
    }

    /// Deliver one key transition to every subscriber of its channel
    pub fn dispatch(&self, transition: KeyTransition, key: Key) -> Suppress {
        let event = RawKeyEvent { key, transition };
        let handlers = match transition {
            KeyTransition::Down => self.key_down.snapshot(),
            KeyTransition::Up => self.key_up.snapshot(),
        };

        let mut suppress = Suppress::No;
        for handler in &handlers {
            suppress |= handler(&event);
        }

        trace!(
            %key,
            ?transition,
            subscribers = handlers.len(),
            suppressed = suppress.is_suppressed(),
            "key event dispatched"
        );
        suppress
    }

    /// Translate a platform key code and dispatch it
    ///
    /// Codes with no [`Key`] mapping are dropped without notifying anyone.
    pub fn dispatch_code(&self, transition: KeyTransition, code: u32) -> Suppress {
        match Key::from_platform_code(code) {
            Some(key) => self.dispatch(transition, key),
            None => {
                trace!(code, ?transition, "unrecognized key code dropped");
                Suppress::No
            }
        }
    }

    fn next_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}
