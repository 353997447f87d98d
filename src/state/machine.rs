//! Edge-triggered combination state machine
//!
//! Tracks which keys of one combination are currently held and decides
//! when the combination fires. A combination fires when one of its keys
//! is released while every key was held, so it fires once per
//! "hold all, release one" gesture and stays quiet while the remaining
//! keys are released.

use tracing::trace;

use crate::hotkey::Key;

/// Down/up state of each key in a combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboState {
    /// Keys in the order they were given, duplicates kept
    keys: Vec<Key>,
    /// `down[i]` is true while `keys[i]` is held
    down: Vec<bool>,
}

impl ComboState {
    /// Create a state machine with every key released
    pub fn new(keys: Vec<Key>) -> Self {
        let down = vec![false; keys.len()];
        Self { keys, down }
    }

    /// The keys of this combination
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Whether every key is currently held
    pub fn is_fully_pressed(&self) -> bool {
        self.down.iter().all(|&down| down)
    }

    /// Whether `key` is currently held
    pub fn is_down(&self, key: Key) -> bool {
        self.index_of(key).is_some_and(|i| self.down[i])
    }

    /// Whether the key list names the same key more than once
    pub fn has_duplicates(&self) -> bool {
        self.keys
            .iter()
            .enumerate()
            .any(|(i, key)| self.keys[..i].contains(key))
    }

    /// Record a key-down. Never fires; repeats are absorbed.
    pub fn key_down(&mut self, key: Key) {
        if let Some(i) = self.index_of(key) {
            self.down[i] = true;
        }
    }

    /// Record a key-up, returning true when the combination fires
    pub fn key_up(&mut self, key: Key) -> bool {
        let Some(i) = self.index_of(key) else {
            return false;
        };

        // Fullness is checked before the released key is cleared
        let fired = self.is_fully_pressed();
        self.down[i] = false;

        if fired {
            trace!(%key, keys = ?self.keys, "combination released while fully pressed");
        }
        fired
    }

    /// Only the first occurrence of a key is ever updated
    fn index_of(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl_shift_k() -> ComboState {
        ComboState::new(vec![Key::LeftControl, Key::LeftShift, Key::K])
    }

    #[test]
    fn test_initial_state() {
        let state = ctrl_shift_k();
        assert!(!state.is_fully_pressed());
        assert!(!state.is_down(Key::K));
        assert_eq!(state.keys(), &[Key::LeftControl, Key::LeftShift, Key::K]);
    }

    #[test]
    fn test_release_one_fires_once() {
        let mut state = ctrl_shift_k();

        state.key_down(Key::LeftControl);
        state.key_down(Key::LeftShift);
        state.key_down(Key::K);
        assert!(state.is_fully_pressed());

        assert!(state.key_up(Key::LeftShift));
        assert!(!state.key_up(Key::LeftControl));
        assert!(!state.key_up(Key::K));
        assert!(!state.is_fully_pressed());
    }

    #[test]
    fn test_release_order_is_symmetric() {
        let mut state = ctrl_shift_k();

        for released in [Key::LeftShift, Key::K, Key::LeftControl] {
            state.key_down(Key::K);
            state.key_down(Key::LeftControl);
            state.key_down(Key::LeftShift);

            assert!(state.key_up(released), "releasing {released} first");
            for key in state.keys().to_vec() {
                assert!(!state.key_up(key));
            }
        }
    }

    #[test]
    fn test_partial_press_does_not_fire() {
        let mut state = ctrl_shift_k();

        state.key_down(Key::LeftControl);
        state.key_down(Key::K);
        assert!(!state.key_up(Key::K));
        assert!(!state.key_up(Key::LeftControl));
    }

    #[test]
    fn test_never_held_together() {
        let mut state = ComboState::new(vec![Key::A, Key::B]);

        state.key_down(Key::A);
        assert!(!state.key_up(Key::A));
        state.key_down(Key::B);
        assert!(!state.key_up(Key::B));
    }

    #[test]
    fn test_down_events_never_fire_and_repeat_is_idempotent() {
        let mut state = ComboState::new(vec![Key::A, Key::B]);

        state.key_down(Key::A);
        state.key_down(Key::A);
        state.key_down(Key::B);
        state.key_down(Key::B);
        state.key_down(Key::A);
        assert!(state.is_fully_pressed());

        assert!(state.key_up(Key::B));
        assert!(!state.key_up(Key::A));
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let mut state = ComboState::new(vec![Key::A, Key::B]);

        state.key_down(Key::A);
        state.key_down(Key::B);
        let before = state.clone();

        state.key_down(Key::Z);
        assert!(!state.key_up(Key::Z));
        assert_eq!(state, before);
        assert!(state.key_up(Key::A));
    }

    #[test]
    fn test_stale_state_after_lost_key_up() {
        let mut state = ComboState::new(vec![Key::A, Key::B]);

        // The key-up for A was never delivered
        state.key_down(Key::A);
        state.key_down(Key::B);
        assert!(state.key_up(Key::B));

        // Pressing B alone now looks like a full press
        state.key_down(Key::B);
        assert!(state.key_up(Key::B));
    }

    #[test]
    fn test_duplicate_keys_never_fire() {
        let mut state = ComboState::new(vec![Key::A, Key::A]);
        assert!(state.has_duplicates());

        state.key_down(Key::A);
        assert!(!state.is_fully_pressed());
        assert!(!state.key_up(Key::A));
        assert!(!ctrl_shift_k().has_duplicates());
    }
}
