//! State machine module for combination detection
//!
//! `ComboState` turns individual key-down/key-up events into a single
//! edge-triggered "fired" decision for one key combination.

mod machine;

pub use machine::ComboState;
