//! Keypad input.
//!
//! `KEYINPUT` is active-low: a 0 bit means the button is held down. Initial
//! state is `0x03FF` (all ten buttons released). `KEYCNT` lets a game ask
//! for an IRQ when a particular combination of keys is held, either ANDed
//! (all selected keys down) or ORed (any selected key down).
//!
//! # Bit map
//!
//! A=0, B=1, Select=2, Start=3, Right=4, Left=5, Up=6, Down=7, R=8, L=9.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
    R,
    L,
}

impl Key {
    const fn bit(self) -> u16 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Select => 2,
            Self::Start => 3,
            Self::Right => 4,
            Self::Left => 5,
            Self::Up => 6,
            Self::Down => 7,
            Self::R => 8,
            Self::L => 9,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Keypad {
    pub key_input: u16,
    pub key_interrupt_control: u16,
}

impl Default for Keypad {
    fn default() -> Self {
        Self {
            key_input: 0x03FF,
            key_interrupt_control: 0,
        }
    }
}

impl Keypad {
    pub fn press(&mut self, key: Key) {
        self.key_input &= !(1 << key.bit());
    }

    pub fn release(&mut self, key: Key) {
        self.key_input |= 1 << key.bit();
    }

    /// True if the combination selected in `KEYCNT` should raise a keypad
    /// IRQ given the current `KEYINPUT` state.
    #[must_use]
    pub fn irq_condition_met(&self) -> bool {
        if self.key_interrupt_control & 0x4000 == 0 {
            return false;
        }
        let selected = self.key_interrupt_control & 0x03FF;
        let held = !self.key_input & 0x03FF;
        if self.key_interrupt_control & 0x8000 != 0 {
            (held & selected) == selected
        } else {
            (held & selected) != 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_all_released() {
        assert_eq!(Keypad::default().key_input, 0x03FF);
    }

    #[test]
    fn press_clears_the_bit_release_sets_it_back() {
        let mut keypad = Keypad::default();
        keypad.press(Key::Start);
        assert_eq!(keypad.key_input & (1 << Key::Start.bit()), 0);

        keypad.release(Key::Start);
        assert_eq!(keypad.key_input & (1 << Key::Start.bit()), 1 << Key::Start.bit());
    }

    #[test]
    fn and_mode_requires_every_selected_key_held() {
        let mut keypad = Keypad::default();
        keypad.key_interrupt_control = 0xC000 | (1 << Key::A.bit()) | (1 << Key::B.bit());
        keypad.press(Key::A);
        assert!(!keypad.irq_condition_met());
        keypad.press(Key::B);
        assert!(keypad.irq_condition_met());
    }

    #[test]
    fn or_mode_triggers_on_any_selected_key() {
        let mut keypad = Keypad::default();
        keypad.key_interrupt_control = 0x4000 | (1 << Key::A.bit()) | (1 << Key::B.bit());
        keypad.press(Key::A);
        assert!(keypad.irq_condition_met());
    }
}
