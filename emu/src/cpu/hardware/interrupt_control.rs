//! Interrupt controller registers.
//!
//! The GBA interrupt system allows hardware events to trigger CPU exceptions.
//! Three registers control interrupt behavior:
//!
//! # Interrupt Registers
//!
//! | Register | Address       | Description                                    |
//! |----------|---------------|------------------------------------------------|
//! | IE       | `0x0400_0200` | Interrupt Enable - which IRQs can fire         |
//! | IF       | `0x0400_0202` | Interrupt Request Flags - pending interrupts   |
//! | IME      | `0x0400_0208` | Interrupt Master Enable - global on/off        |
//!
//! # Interrupt Sources
//!
//! Each bit in IE/IF corresponds to an interrupt source:
//!
//! | Bit | Source  | Description                    |
//! |-----|---------|--------------------------------|
//! | 0   | VBlank  | Vertical blank period started  |
//! | 1   | HBlank  | Horizontal blank period        |
//! | 2   | VCount  | Scanline counter match         |
//! | 3-6 | Timer   | Timer 0-3 overflow             |
//! | 7   | Serial  | Serial communication           |
//! | 8-11| DMA     | DMA 0-3 complete               |
//! | 12  | Keypad  | Button combination pressed     |
//! | 13  | GamePak | External cartridge interrupt   |
//!
//! # Interrupt Flow
//!
//! 1. Hardware sets a bit in IF when an event occurs
//! 2. If that bit is also set in IE, and IME is enabled, the CPU takes an IRQ exception
//! 3. The IRQ handler reads IF to determine which interrupt(s) fired
//! 4. Handler writes `1` to IF bits to acknowledge/clear them
//!
//! See [`Bus::is_irq_pending`](crate::bus::Bus::is_irq_pending) for the pending check.

use serde::{Deserialize, Serialize};

/// Interrupt control registers for the GBA.
///
/// These registers are memory-mapped at `0x0400_0200` and accessed through the
/// [`Bus`](crate::bus::Bus).
#[derive(Serialize, Deserialize, Default)]
pub struct InterruptControl {
    pub interrupt_enable: u16,
    /// Interrupt Request Flags (IF), bits are set when interrupts are requested,
    /// cleared by writing 1 to the corresponding bit
    pub interrupt_request: u16,
    pub wait_state_control: u16,
    pub interrupt_master_enable: u16,
    pub post_boot_flag: u8,
    pub power_down_control: u8,
    pub purpose_unknown: u8,
    pub internal_memory_control: u32,
}

/// Bit positions within IE/IF.
pub mod source {
    pub const VBLANK: u16 = 0;
    pub const HBLANK: u16 = 1;
    pub const VCOUNT: u16 = 2;
    pub const TIMER0: u16 = 3;
    pub const TIMER1: u16 = 4;
    pub const TIMER2: u16 = 5;
    pub const TIMER3: u16 = 6;
    pub const SERIAL: u16 = 7;
    pub const DMA0: u16 = 8;
    pub const DMA1: u16 = 9;
    pub const DMA2: u16 = 10;
    pub const DMA3: u16 = 11;
    pub const KEYPAD: u16 = 12;
    pub const GAMEPAK: u16 = 13;
}

impl InterruptControl {
    /// Sets the IF bit for `source`. Hardware events call this; they never
    /// clear IF themselves, only the handler does (by writing 1 to it).
    pub fn request(&mut self, source: u16) {
        self.interrupt_request |= 1 << source;
    }

    /// Handles a CPU write to IF: each written 1 bit clears the matching
    /// flag, each written 0 bit leaves its flag untouched.
    pub fn acknowledge(&mut self, written: u16) {
        self.interrupt_request &= !written;
    }

    /// True once IME is set and at least one enabled source has a pending
    /// flag. The CPU still gates this on CPSR's I bit before taking the
    /// exception; that check lives in the CPU, not here.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.interrupt_master_enable & 1 != 0
            && (self.interrupt_enable & self.interrupt_request) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_requires_ime_and_matching_enable_bit() {
        let mut ic = InterruptControl::default();
        ic.request(source::VBLANK);
        assert!(!ic.has_pending());

        ic.interrupt_master_enable = 1;
        assert!(!ic.has_pending());

        ic.interrupt_enable = 1 << source::VBLANK;
        assert!(ic.has_pending());
    }

    #[test]
    fn acknowledge_clears_only_written_bits() {
        let mut ic = InterruptControl::default();
        ic.request(source::VBLANK);
        ic.request(source::TIMER0);

        ic.acknowledge(1 << source::VBLANK);
        assert_eq!(ic.interrupt_request, 1 << source::TIMER0);
    }
}
