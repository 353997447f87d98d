//! Key combinations tracked against the global keyboard hook
//!
//! A [`CombinationTracker`] subscribes to an [`InputHookService`] when it
//! is built and feeds every event into a [`ComboState`]. When the state
//! machine reports that the combination fired, the owner's callback runs
//! synchronously on the hook thread.
//!
//! The fired callback blocks system-wide keyboard input until it
//! returns. Hand work off (e.g. through a channel) instead of doing it
//! inline.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, info, warn};

use super::keys::Key;
use super::listener::HotkeyError;
use super::service::{InputHookService, RawKeyEvent, Subscription, Suppress};
use crate::state::ComboState;

/// Behaviour switches for a tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Consume the key-up that fires the combination so the focused
    /// application never sees it
    pub suppress_on_fire: bool,
}

struct TrackerCell {
    combo: ComboState,
    disposed: bool,
}

/// State shared between the tracker and its subscriptions
///
/// The cell lock is re-entrant so a fired callback may dispose its own
/// tracker on the hook thread. A `dispose` from any other thread waits for
/// an in-flight event to finish.
struct TrackerInner {
    cell: ReentrantMutex<RefCell<TrackerCell>>,
    on_fired: Box<dyn Fn() + Send + Sync>,
    options: TrackerOptions,
}

impl TrackerInner {
    fn handle_key_down(&self, event: &RawKeyEvent) -> Suppress {
        let guard = self.cell.lock();
        let mut cell = guard.borrow_mut();
        if !cell.disposed {
            cell.combo.key_down(event.key);
        }
        Suppress::No
    }

    fn handle_key_up(&self, event: &RawKeyEvent) -> Suppress {
        let guard = self.cell.lock();
        let fired = {
            let mut cell = guard.borrow_mut();
            !cell.disposed && cell.combo.key_up(event.key)
        };
        if !fired {
            return Suppress::No;
        }

        debug!(key = %event.key, "combination fired");
        (self.on_fired)();
        Suppress::from(self.options.suppress_on_fire)
    }
}

/// One key combination watched system-wide
///
/// Disposing (or dropping) the tracker unsubscribes it. No state change
/// and no fired callback happen after [`dispose`](Self::dispose) returns.
pub struct CombinationTracker {
    inner: Arc<TrackerInner>,
    keys: Vec<Key>,
    service: Arc<InputHookService>,
    subscription: Subscription,
}

impl CombinationTracker {
    /// Start tracking `keys` and call `on_fired` each time the combination fires
    pub fn new<F>(
        service: &Arc<InputHookService>,
        keys: Vec<Key>,
        on_fired: F,
    ) -> Result<Self, HotkeyError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_options(service, keys, TrackerOptions::default(), on_fired)
    }

    pub fn with_options<F>(
        service: &Arc<InputHookService>,
        keys: Vec<Key>,
        options: TrackerOptions,
        on_fired: F,
    ) -> Result<Self, HotkeyError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if keys.is_empty() {
            return Err(HotkeyError::EmptyCombination);
        }

        let combo = ComboState::new(keys.clone());
        if combo.has_duplicates() {
            warn!(?keys, "combination repeats a key and can never fire");
        }

        let inner = Arc::new(TrackerInner {
            cell: ReentrantMutex::new(RefCell::new(TrackerCell {
                combo,
                disposed: false,
            })),
            on_fired: Box::new(on_fired),
            options,
        });

        let down = Arc::clone(&inner);
        let up = Arc::clone(&inner);
        let subscription = service.subscribe(
            move |event| down.handle_key_down(event),
            move |event| up.handle_key_up(event),
        );

        info!(?keys, suppress_on_fire = options.suppress_on_fire, "combination registered");

        Ok(Self {
            inner,
            keys,
            service: Arc::clone(service),
            subscription,
        })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn options(&self) -> TrackerOptions {
        self.inner.options
    }

    /// Whether every key of the combination is currently held
    pub fn is_fully_pressed(&self) -> bool {
        let guard = self.inner.cell.lock();
        let cell = guard.borrow();
        cell.combo.is_fully_pressed()
    }

    pub fn is_disposed(&self) -> bool {
        let guard = self.inner.cell.lock();
        let disposed = guard.borrow().disposed;
        disposed
    }

    /// Stop tracking. Calling this more than once is a no-op.
    pub fn dispose(&self) {
        {
            let guard = self.inner.cell.lock();
            let mut cell = guard.borrow_mut();
            if cell.disposed {
                return;
            }
            cell.disposed = true;
        }

        self.service.unsubscribe(&self.subscription);
        info!(keys = ?self.keys, "combination disposed");
    }
}

impl Drop for CombinationTracker {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for CombinationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinationTracker")
            .field("keys", &self.keys)
            .field("subscription", &self.subscription)
            .field("options", &self.inner.options)
            .finish()
    }
}
