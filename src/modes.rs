//! Terminal mode registry
//!
//! An open set of (namespace, number) -> bool instead of a closed enum:
//! modes we act on (autowrap, alternate screen, cursor visibility) and modes
//! we merely record (mouse tracking, bracketed paste) share one store with
//! absent-means-false semantics. The Kitty keyboard protocol flags live here
//! too since they are mode-like state with their own push/pop stack.

use std::collections::HashMap;

/// Mode namespace: ANSI (CSI h/l) or DEC private (CSI ? h/l)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeNamespace {
    Ansi,
    DecPrivate,
}

// Well-known DEC private mode numbers used by the screen itself
pub const DECCKM: u16 = 1;
pub const DECOM: u16 = 6;
pub const DECAWM: u16 = 7;
pub const DECTCEM: u16 = 25;
pub const ALT_SCREEN: u16 = 47;
pub const MOUSE_X10: u16 = 1000;
pub const MOUSE_BUTTON: u16 = 1002;
pub const MOUSE_ANY: u16 = 1003;
pub const MOUSE_SGR: u16 = 1006;
pub const ALT_SCREEN_1047: u16 = 1047;
pub const SAVE_CURSOR_1048: u16 = 1048;
pub const ALT_SCREEN_SAVE: u16 = 1049;
pub const BRACKETED_PASTE: u16 = 2004;

// ANSI modes
pub const IRM: u16 = 4;
pub const LNM: u16 = 20;

/// Kitty keyboard stack depth bound (the protocol suggests terminals keep a
/// small bounded stack and drop the oldest entry on overflow)
const KITTY_STACK_MAX: usize = 32;

#[derive(Debug, Default)]
pub struct ModeRegistry {
    modes: HashMap<(ModeNamespace, u16), bool>,
    kitty_flags: u8,
    kitty_stack: Vec<u8>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        let mut registry = Self::default();
        // Modes that are on by default
        registry.set(ModeNamespace::DecPrivate, DECAWM, true);
        registry.set(ModeNamespace::DecPrivate, DECTCEM, true);
        registry
    }

    /// Query a mode; absent means false
    #[inline]
    pub fn get(&self, ns: ModeNamespace, number: u16) -> bool {
        self.modes.get(&(ns, number)).copied().unwrap_or(false)
    }

    pub fn set(&mut self, ns: ModeNamespace, number: u16, enabled: bool) {
        if enabled {
            self.modes.insert((ns, number), true);
        } else {
            // Keep the map sparse
            self.modes.remove(&(ns, number));
        }
    }

    /// Reset to creation defaults (RIS)
    pub fn reset(&mut self) {
        self.modes.clear();
        self.kitty_flags = 0;
        self.kitty_stack.clear();
        self.set(ModeNamespace::DecPrivate, DECAWM, true);
        self.set(ModeNamespace::DecPrivate, DECTCEM, true);
    }

    /// True when any mouse tracking variant is active
    pub fn mouse_tracking(&self) -> bool {
        self.get(ModeNamespace::DecPrivate, MOUSE_X10)
            || self.get(ModeNamespace::DecPrivate, MOUSE_BUTTON)
            || self.get(ModeNamespace::DecPrivate, MOUSE_ANY)
    }

    // ========== Kitty keyboard protocol ==========

    #[inline]
    pub fn kitty_keyboard_flags(&self) -> u8 {
        self.kitty_flags
    }

    /// CSI > flags u
    pub fn kitty_keyboard_push(&mut self, flags: u8) {
        if self.kitty_stack.len() == KITTY_STACK_MAX {
            self.kitty_stack.remove(0);
        }
        self.kitty_stack.push(self.kitty_flags);
        self.kitty_flags = flags;
    }

    /// CSI < n u
    pub fn kitty_keyboard_pop(&mut self, n: usize) {
        for _ in 0..n {
            match self.kitty_stack.pop() {
                Some(flags) => self.kitty_flags = flags,
                None => {
                    self.kitty_flags = 0;
                    break;
                }
            }
        }
    }

    /// CSI = flags ; mode u: 1 = set, 2 = or, 3 = and-not
    pub fn kitty_keyboard_set(&mut self, flags: u8, mode: u16) {
        match mode {
            1 => self.kitty_flags = flags,
            2 => self.kitty_flags |= flags,
            3 => self.kitty_flags &= !flags,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_mode_is_false() {
        let registry = ModeRegistry::new();
        assert!(!registry.get(ModeNamespace::DecPrivate, BRACKETED_PASTE));
        assert!(!registry.get(ModeNamespace::Ansi, IRM));
    }

    #[test]
    fn defaults_are_seeded() {
        let registry = ModeRegistry::new();
        assert!(registry.get(ModeNamespace::DecPrivate, DECAWM));
        assert!(registry.get(ModeNamespace::DecPrivate, DECTCEM));
    }

    #[test]
    fn namespaces_are_distinct() {
        let mut registry = ModeRegistry::new();
        registry.set(ModeNamespace::Ansi, 4, true);
        assert!(registry.get(ModeNamespace::Ansi, 4));
        assert!(!registry.get(ModeNamespace::DecPrivate, 4));
    }

    #[test]
    fn mouse_tracking_covers_all_variants() {
        let mut registry = ModeRegistry::new();
        assert!(!registry.mouse_tracking());
        registry.set(ModeNamespace::DecPrivate, MOUSE_BUTTON, true);
        assert!(registry.mouse_tracking());
        registry.set(ModeNamespace::DecPrivate, MOUSE_BUTTON, false);
        assert!(!registry.mouse_tracking());
    }

    #[test]
    fn kitty_keyboard_push_pop() {
        let mut registry = ModeRegistry::new();
        registry.kitty_keyboard_push(0b1);
        registry.kitty_keyboard_push(0b101);
        assert_eq!(registry.kitty_keyboard_flags(), 0b101);
        registry.kitty_keyboard_pop(1);
        assert_eq!(registry.kitty_keyboard_flags(), 0b1);
        // Popping past the bottom lands on 0
        registry.kitty_keyboard_pop(5);
        assert_eq!(registry.kitty_keyboard_flags(), 0);
    }

    #[test]
    fn kitty_keyboard_set_modes() {
        let mut registry = ModeRegistry::new();
        registry.kitty_keyboard_set(0b11, 1);
        assert_eq!(registry.kitty_keyboard_flags(), 0b11);
        registry.kitty_keyboard_set(0b100, 2);
        assert_eq!(registry.kitty_keyboard_flags(), 0b111);
        registry.kitty_keyboard_set(0b10, 3);
        assert_eq!(registry.kitty_keyboard_flags(), 0b101);
    }
}
