//! Portable key identifiers and platform key code translation
//!
//! Every platform hook translates its native code into a [`Key`] exactly
//! once, at the boundary. Codes without a mapping yield `None` and the
//! event is dropped before it reaches any tracker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One physical key, independent of the platform that reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[rustfmt::skip]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10,
    F11, F12, F13, F14, F15, F16, F17, F18, F19, F20,

    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    LeftMeta,
    RightMeta,
    CapsLock,

    Escape,
    Tab,
    Space,
    Enter,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Left,
    Right,
    Up,
    Down,
    PrintScreen,
    ScrollLock,
    Pause,
    NumLock,

    Minus,
    Equal,
    LeftBracket,
    RightBracket,
    Backslash,
    Semicolon,
    Quote,
    Backquote,
    Comma,
    Period,
    Slash,

    Numpad0, Numpad1, Numpad2, Numpad3, Numpad4,
    Numpad5, Numpad6, Numpad7, Numpad8, Numpad9,
    NumpadAdd,
    NumpadSubtract,
    NumpadMultiply,
    NumpadDivide,
    NumpadDecimal,
}

impl Key {
    /// Every key, in declaration order
    #[rustfmt::skip]
    pub const ALL: &'static [Key] = &[
        Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
        Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
        Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
        Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
        Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
        Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6, Key::F7, Key::F8,
        Key::F9, Key::F10, Key::F11, Key::F12, Key::F13, Key::F14, Key::F15,
        Key::F16, Key::F17, Key::F18, Key::F19, Key::F20,
        Key::LeftShift, Key::RightShift, Key::LeftControl, Key::RightControl,
        Key::LeftAlt, Key::RightAlt, Key::LeftMeta, Key::RightMeta, Key::CapsLock,
        Key::Escape, Key::Tab, Key::Space, Key::Enter, Key::Backspace, Key::Delete,
        Key::Insert, Key::Home, Key::End, Key::PageUp, Key::PageDown, Key::Left,
        Key::Right, Key::Up, Key::Down, Key::PrintScreen, Key::ScrollLock,
        Key::Pause, Key::NumLock,
        Key::Minus, Key::Equal, Key::LeftBracket, Key::RightBracket, Key::Backslash,
        Key::Semicolon, Key::Quote, Key::Backquote, Key::Comma, Key::Period,
        Key::Slash,
        Key::Numpad0, Key::Numpad1, Key::Numpad2, Key::Numpad3, Key::Numpad4,
        Key::Numpad5, Key::Numpad6, Key::Numpad7, Key::Numpad8, Key::Numpad9,
        Key::NumpadAdd, Key::NumpadSubtract, Key::NumpadMultiply,
        Key::NumpadDivide, Key::NumpadDecimal,
    ];

    /// Whether this key is one of the shift/control/alt/meta modifiers
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LeftShift
                | Key::RightShift
                | Key::LeftControl
                | Key::RightControl
                | Key::LeftAlt
                | Key::RightAlt
                | Key::LeftMeta
                | Key::RightMeta
        )
    }

    /// Translate a code delivered by the hook of the platform we are built for
    pub fn from_platform_code(code: u32) -> Option<Key> {
        #[cfg(target_os = "macos")]
        {
            u16::try_from(code).ok().and_then(Key::from_macos_keycode)
        }
        #[cfg(not(target_os = "macos"))]
        {
            Key::from_windows_vk(code)
        }
    }

    /// Translate a Win32 virtual-key code (`KBDLLHOOKSTRUCT::vkCode`)
    ///
    /// The generic `VK_SHIFT`, `VK_CONTROL` and `VK_MENU` codes map to the
    /// left-hand key.
    pub fn from_windows_vk(vk: u32) -> Option<Key> {
        #[rustfmt::skip]
        const LETTERS: [Key; 26] = [
            Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
            Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
            Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
        ];
        #[rustfmt::skip]
        const DIGITS: [Key; 10] = [
            Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
            Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
        ];
        #[rustfmt::skip]
        const NUMPAD: [Key; 10] = [
            Key::Numpad0, Key::Numpad1, Key::Numpad2, Key::Numpad3, Key::Numpad4,
            Key::Numpad5, Key::Numpad6, Key::Numpad7, Key::Numpad8, Key::Numpad9,
        ];
        #[rustfmt::skip]
        const FUNCTION: [Key; 20] = [
            Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6, Key::F7,
            Key::F8, Key::F9, Key::F10, Key::F11, Key::F12, Key::F13, Key::F14,
            Key::F15, Key::F16, Key::F17, Key::F18, Key::F19, Key::F20,
        ];

        let key = match vk {
            0x41..=0x5A => LETTERS[(vk - 0x41) as usize],
            0x30..=0x39 => DIGITS[(vk - 0x30) as usize],
            0x60..=0x69 => NUMPAD[(vk - 0x60) as usize],
            0x70..=0x83 => FUNCTION[(vk - 0x70) as usize],
            0x10 | 0xA0 => Key::LeftShift,
            0xA1 => Key::RightShift,
            0x11 | 0xA2 => Key::LeftControl,
            0xA3 => Key::RightControl,
            0x12 | 0xA4 => Key::LeftAlt,
            0xA5 => Key::RightAlt,
            0x5B => Key::LeftMeta,
            0x5C => Key::RightMeta,
            0x14 => Key::CapsLock,
            0x1B => Key::Escape,
            0x09 => Key::Tab,
            0x20 => Key::Space,
            0x0D => Key::Enter,
            0x08 => Key::Backspace,
            0x2E => Key::Delete,
            0x2D => Key::Insert,
            0x24 => Key::Home,
            0x23 => Key::End,
            0x21 => Key::PageUp,
            0x22 => Key::PageDown,
            0x25 => Key::Left,
            0x26 => Key::Up,
            0x27 => Key::Right,
            0x28 => Key::Down,
            0x2C => Key::PrintScreen,
            0x91 => Key::ScrollLock,
            0x13 => Key::Pause,
            0x90 => Key::NumLock,
            0xBD => Key::Minus,
            0xBB => Key::Equal,
            0xDB => Key::LeftBracket,
            0xDD => Key::RightBracket,
            0xDC => Key::Backslash,
            0xBA => Key::Semicolon,
            0xDE => Key::Quote,
            0xC0 => Key::Backquote,
            0xBC => Key::Comma,
            0xBE => Key::Period,
            0xBF => Key::Slash,
            0x6A => Key::NumpadMultiply,
            0x6B => Key::NumpadAdd,
            0x6D => Key::NumpadSubtract,
            0x6E => Key::NumpadDecimal,
            0x6F => Key::NumpadDivide,
            _ => return None,
        };
        Some(key)
    }

    /// Translate a macOS virtual keycode (`kVK_*`, the
    /// `KEYBOARD_EVENT_KEYCODE` field of a CGEvent)
    ///
    /// `kVK_CapsLock` translates, but the macOS hook never delivers it: the
    /// key only toggles a lock flag and reports no release.
    pub fn from_macos_keycode(code: u16) -> Option<Key> {
        let key = match code {
            0x00 => Key::A,
            0x01 => Key::S,
            0x02 => Key::D,
            0x03 => Key::F,
            0x04 => Key::H,
            0x05 => Key::G,
            0x06 => Key::Z,
            0x07 => Key::X,
            0x08 => Key::C,
            0x09 => Key::V,
            0x0B => Key::B,
            0x0C => Key::Q,
            0x0D => Key::W,
            0x0E => Key::E,
            0x0F => Key::R,
            0x10 => Key::Y,
            0x11 => Key::T,
            0x12 => Key::Digit1,
            0x13 => Key::Digit2,
            0x14 => Key::Digit3,
            0x15 => Key::Digit4,
            0x16 => Key::Digit6,
            0x17 => Key::Digit5,
            0x18 => Key::Equal,
            0x19 => Key::Digit9,
            0x1A => Key::Digit7,
            0x1B => Key::Minus,
            0x1C => Key::Digit8,
            0x1D => Key::Digit0,
            0x1E => Key::RightBracket,
            0x1F => Key::O,
            0x20 => Key::U,
            0x21 => Key::LeftBracket,
            0x22 => Key::I,
            0x23 => Key::P,
            0x24 => Key::Enter,
            0x25 => Key::L,
            0x26 => Key::J,
            0x27 => Key::Quote,
            0x28 => Key::K,
            0x29 => Key::Semicolon,
            0x2A => Key::Backslash,
            0x2B => Key::Comma,
            0x2C => Key::Slash,
            0x2D => Key::N,
            0x2E => Key::M,
            0x2F => Key::Period,
            0x30 => Key::Tab,
            0x31 => Key::Space,
            0x32 => Key::Backquote,
            0x33 => Key::Backspace,
            0x35 => Key::Escape,
            0x36 => Key::RightMeta,
            0x37 => Key::LeftMeta,
            0x38 => Key::LeftShift,
            0x39 => Key::CapsLock,
            0x3A => Key::LeftAlt,
            0x3B => Key::LeftControl,
            0x3C => Key::RightShift,
            0x3D => Key::RightAlt,
            0x3E => Key::RightControl,
            0x40 => Key::F17,
            0x41 => Key::NumpadDecimal,
            0x43 => Key::NumpadMultiply,
            0x45 => Key::NumpadAdd,
            0x47 => Key::NumLock,
            0x4B => Key::NumpadDivide,
            0x4E => Key::NumpadSubtract,
            0x4F => Key::F18,
            0x50 => Key::F19,
            0x52 => Key::Numpad0,
            0x53 => Key::Numpad1,
            0x54 => Key::Numpad2,
            0x55 => Key::Numpad3,
            0x56 => Key::Numpad4,
            0x57 => Key::Numpad5,
            0x58 => Key::Numpad6,
            0x59 => Key::Numpad7,
            0x5A => Key::F20,
            0x5B => Key::Numpad8,
            0x5C => Key::Numpad9,
            0x60 => Key::F5,
            0x61 => Key::F6,
            0x62 => Key::F7,
            0x63 => Key::F3,
            0x64 => Key::F8,
            0x65 => Key::F9,
            0x67 => Key::F11,
            0x69 => Key::F13,
            0x6A => Key::F16,
            0x6B => Key::F14,
            0x6D => Key::F10,
            0x6F => Key::F12,
            0x71 => Key::F15,
            0x72 => Key::Insert,
            0x73 => Key::Home,
            0x74 => Key::PageUp,
            0x75 => Key::Delete,
            0x76 => Key::F4,
            0x77 => Key::End,
            0x78 => Key::F2,
            0x79 => Key::PageDown,
            0x7A => Key::F1,
            0x7B => Key::Left,
            0x7C => Key::Right,
            0x7D => Key::Down,
            0x7E => Key::Up,
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors from parsing key names and combinations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),

    #[error("key combination is empty")]
    Empty,
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();

        let alias = match name.to_ascii_lowercase().as_str() {
            "ctrl" | "control" | "lctrl" => Some(Key::LeftControl),
            "rctrl" => Some(Key::RightControl),
            "shift" | "lshift" => Some(Key::LeftShift),
            "rshift" => Some(Key::RightShift),
            "alt" | "option" | "lalt" => Some(Key::LeftAlt),
            "ralt" | "altgr" => Some(Key::RightAlt),
            "meta" | "cmd" | "command" | "win" | "super" => Some(Key::LeftMeta),
            "esc" => Some(Key::Escape),
            "return" => Some(Key::Enter),
            "del" => Some(Key::Delete),
            "ins" => Some(Key::Insert),
            "pgup" => Some(Key::PageUp),
            "pgdn" => Some(Key::PageDown),
            _ => None,
        };
        if let Some(key) = alias {
            return Ok(key);
        }

        // "5" and "Digit5" are the same key
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_digit() {
                return format!("Digit{c}").parse();
            }
        }

        Key::ALL
            .iter()
            .copied()
            .find(|key| key.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| KeyParseError::UnknownKey(name.to_string()))
    }
}

/// Parse a `+`-separated combination such as `"LeftControl+LeftShift+K"`
///
/// Order is preserved and duplicates are kept as written.
pub fn parse_combination(spec: &str) -> Result<Vec<Key>, KeyParseError> {
    if spec.trim().is_empty() {
        return Err(KeyParseError::Empty);
    }
    spec.split('+').map(str::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_letters_and_modifiers() {
        assert_eq!(Key::from_windows_vk(0x41), Some(Key::A));
        assert_eq!(Key::from_windows_vk(0x4B), Some(Key::K));
        assert_eq!(Key::from_windows_vk(0x5A), Some(Key::Z));
        assert_eq!(Key::from_windows_vk(0xA2), Some(Key::LeftControl));
        assert_eq!(Key::from_windows_vk(0x11), Some(Key::LeftControl));
        assert_eq!(Key::from_windows_vk(0xA1), Some(Key::RightShift));
        assert_eq!(Key::from_windows_vk(0x83), Some(Key::F20));
    }

    #[test]
    fn test_unknown_codes_are_dropped() {
        // VK_BROWSER_BACK and an out-of-range code
        assert_eq!(Key::from_windows_vk(0xA6), None);
        assert_eq!(Key::from_windows_vk(0xFFFF), None);
        // kVK_Function has no portable equivalent
        assert_eq!(Key::from_macos_keycode(0x3F), None);
    }

    #[test]
    fn test_macos_keycodes() {
        assert_eq!(Key::from_macos_keycode(0x00), Some(Key::A));
        assert_eq!(Key::from_macos_keycode(0x28), Some(Key::K));
        assert_eq!(Key::from_macos_keycode(0x3B), Some(Key::LeftControl));
        assert_eq!(Key::from_macos_keycode(0x36), Some(Key::RightMeta));
        assert_eq!(Key::from_macos_keycode(0x7A), Some(Key::F1));
    }

    #[test]
    fn test_every_key_is_reachable_from_both_platforms() {
        for key in Key::ALL {
            let windows = (0..=0xFF).any(|vk| Key::from_windows_vk(vk) == Some(*key));
            let macos = (0..=0x7F).any(|code| Key::from_macos_keycode(code) == Some(*key));
            assert!(windows, "{key} has no Windows virtual-key code");
            // macOS keyboards have no Pause, PrintScreen or ScrollLock keys
            if !matches!(key, Key::Pause | Key::PrintScreen | Key::ScrollLock) {
                assert!(macos, "{key} has no macOS keycode");
            }
        }
    }

    #[test]
    fn test_all_lists_every_key_once_in_declaration_order() {
        assert!(Key::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(Key::ALL.first(), Some(&Key::A));
        assert_eq!(Key::ALL.last(), Some(&Key::NumpadDecimal));
        assert_eq!(Key::ALL.len(), Key::NumpadDecimal as usize + 1);
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("LeftControl".parse::<Key>(), Ok(Key::LeftControl));
        assert_eq!("leftcontrol".parse::<Key>(), Ok(Key::LeftControl));
        assert_eq!("ctrl".parse::<Key>(), Ok(Key::LeftControl));
        assert_eq!("Cmd".parse::<Key>(), Ok(Key::LeftMeta));
        assert_eq!("k".parse::<Key>(), Ok(Key::K));
        assert_eq!("7".parse::<Key>(), Ok(Key::Digit7));
        assert_eq!(" F12 ".parse::<Key>(), Ok(Key::F12));
        assert_eq!(
            "Hyper".parse::<Key>(),
            Err(KeyParseError::UnknownKey("Hyper".to_string()))
        );
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        assert_eq!(Key::PageDown.to_string(), "PageDown");
        assert_eq!("PageDown".parse::<Key>(), Ok(Key::PageDown));
    }

    #[test]
    fn test_parse_combination() {
        assert_eq!(
            parse_combination("LeftControl+LeftShift+K"),
            Ok(vec![Key::LeftControl, Key::LeftShift, Key::K])
        );
        assert_eq!(parse_combination("a+a"), Ok(vec![Key::A, Key::A]));
        assert_eq!(parse_combination("  "), Err(KeyParseError::Empty));
        assert!(matches!(
            parse_combination("ctrl++k"),
            Err(KeyParseError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_is_modifier() {
        assert!(Key::RightAlt.is_modifier());
        assert!(!Key::CapsLock.is_modifier());
        assert!(!Key::K.is_modifier());
    }
}
