//! DMA controller: four independent channels that copy words or halfwords
//! between memory regions without CPU involvement.
//!
//! Source/destination/count are write-only latches; the moment the enable
//! bit rises, the latches are copied into the live cursors the transfer
//! actually walks, so a game rewriting `DMAxSAD` mid-transfer can't disturb
//! one already running. A non-repeat channel clears its own enable bit on
//! completion; a repeating channel reloads the destination (unless it is
//! increment-reload, which only resets on VBlank/HBlank rearm) and waits
//! for its trigger to fire again.
//!
//! # Registers (per channel)
//!
//! | Register     | Meaning                                               |
//! |--------------|--------------------------------------------------------|
//! | `DMAxSAD`     | Source address latch                                   |
//! | `DMAxDAD`     | Destination address latch                               |
//! | `DMAxCNT_L`   | Word count latch                                        |
//! | `DMAxCNT_H`   | Control: adjust modes, repeat, size, timing, IRQ, enable|

use serde::{Deserialize, Serialize};

/// Address adjustment applied to source/destination after each unit copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressControl {
    Increment,
    Decrement,
    Fixed,
    IncrementReload,
}

impl AddressControl {
    const fn from_bits(bits: u16) -> Self {
        match bits {
            0 => Self::Increment,
            1 => Self::Decrement,
            2 => Self::Fixed,
            _ => Self::IncrementReload,
        }
    }

    const fn step(self, unit_size: i32) -> i32 {
        match self {
            Self::Increment | Self::IncrementReload => unit_size,
            Self::Decrement => -unit_size,
            Self::Fixed => 0,
        }
    }
}

/// When a channel's transfer actually starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTiming {
    Immediate,
    VBlank,
    HBlank,
    Special,
}

impl DmaTiming {
    const fn from_bits(bits: u16) -> Self {
        match bits {
            0 => Self::Immediate,
            1 => Self::VBlank,
            2 => Self::HBlank,
            _ => Self::Special,
        }
    }
}

const SRC_MASKS: [u32; 4] = [0x07FF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF];
const DST_MASKS: [u32; 4] = [0x07FF_FFFF, 0x07FF_FFFF, 0x07FF_FFFF, 0x0FFF_FFFF];
const COUNT_MASKS: [u32; 4] = [0x3FFF, 0x3FFF, 0x3FFF, 0xFFFF];

#[derive(Default, Serialize, Deserialize)]
struct DmaChannel {
    source_latch: u32,
    dest_latch: u32,
    count_latch: u16,
    control: u16,

    source_cursor: u32,
    dest_cursor: u32,
    remaining: u32,
    running: bool,
    was_enabled: bool,
}

impl DmaChannel {
    const fn enabled(&self) -> bool {
        self.control & 0x8000 != 0
    }

    const fn repeat(&self) -> bool {
        self.control & 0x0200 != 0
    }

    const fn transfer_word(&self) -> bool {
        self.control & 0x0400 != 0
    }

    const fn irq_on_end(&self) -> bool {
        self.control & 0x4000 != 0
    }

    fn timing(&self) -> DmaTiming {
        DmaTiming::from_bits((self.control >> 12) & 0x3)
    }

    fn dest_control(&self) -> AddressControl {
        AddressControl::from_bits((self.control >> 5) & 0x3)
    }

    fn source_control(&self) -> AddressControl {
        AddressControl::from_bits((self.control >> 7) & 0x3)
    }

    fn unit_size(&self) -> u32 {
        if self.transfer_word() {
            4
        } else {
            2
        }
    }

    fn latch_on_rising_edge(&mut self, channel: usize) {
        let now = self.enabled();
        if now && !self.was_enabled {
            self.source_cursor = self.source_latch & SRC_MASKS[channel];
            self.dest_cursor = self.dest_latch & DST_MASKS[channel];
            self.remaining = u32::from(self.count_latch) & COUNT_MASKS[channel];
            if self.remaining == 0 {
                self.remaining = COUNT_MASKS[channel] + 1;
            }
            self.running = true;
        }
        self.was_enabled = now;
    }
}

/// One unit transferred by a running DMA, for the bus to carry out.
pub struct DmaUnit {
    pub source: u32,
    pub dest: u32,
    pub word: bool,
}

#[derive(Default)]
pub struct DmaStepOutput {
    pub units: Vec<DmaUnit>,
    pub irq_channels: Vec<u8>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct Dma {
    channels: [DmaChannel; 4],
}

impl Dma {
    /// Forces a FIFO-refill transfer on `channel`: always 4 units of 32
    /// bits, destination fixed, ignoring the channel's own count latch.
    /// Used by the sound mixer when a FIFO drops to half capacity.
    pub fn trigger_fifo_refill(&mut self, channel: usize) -> Vec<DmaUnit> {
        let ch = &mut self.channels[channel];
        if !ch.enabled() {
            return Vec::new();
        }
        let source_step = ch.source_control().step(4);
        let mut units = Vec::with_capacity(4);
        for _ in 0..4 {
            units.push(DmaUnit {
                source: ch.source_cursor,
                dest: ch.dest_cursor,
                word: true,
            });
            ch.source_cursor = ch.source_cursor.wrapping_add_signed(source_step);
        }
        units
    }

    /// Runs any channel whose trigger matches `timing`, one full transfer
    /// (or the channel's configured one-shot chunk) per call.
    pub fn run_triggered(&mut self, timing: DmaTiming) -> DmaStepOutput {
        let mut output = DmaStepOutput::default();

        for index in 0..4 {
            self.channels[index].latch_on_rising_edge(index);
            let ch = &self.channels[index];
            if !ch.running || ch.timing() != timing {
                continue;
            }

            self.run_transfer(index, &mut output);
        }

        output
    }

    fn run_transfer(&mut self, index: usize, output: &mut DmaStepOutput) {
        let word = self.channels[index].transfer_word();
        let unit_size = self.channels[index].unit_size();
        let source_step = self.channels[index].source_control().step(unit_size as i32);
        let dest_step = self.channels[index].dest_control().step(unit_size as i32);

        while self.channels[index].remaining > 0 {
            let ch = &mut self.channels[index];
            output.units.push(DmaUnit {
                source: ch.source_cursor,
                dest: ch.dest_cursor,
                word,
            });
            ch.source_cursor = ch.source_cursor.wrapping_add_signed(source_step);
            ch.dest_cursor = ch.dest_cursor.wrapping_add_signed(dest_step);
            ch.remaining -= 1;
        }

        let ch = &mut self.channels[index];
        ch.running = false;
        if ch.irq_on_end() {
            output.irq_channels.push(index as u8);
        }

        if ch.repeat() {
            if ch.dest_control() == AddressControl::IncrementReload {
                ch.dest_cursor = ch.dest_latch & DST_MASKS[index];
            }
            ch.was_enabled = false; // rearm for the next rising edge
        } else {
            ch.control &= !0x8000;
            ch.was_enabled = false;
        }
    }

    #[must_use]
    pub fn source_low(&self, index: usize) -> u8 {
        self.channels[index].source_latch as u8
    }

    pub fn set_source(&mut self, index: usize, shift: u32, value: u8) {
        let ch = &mut self.channels[index];
        let mask = !(0xFFu32 << shift);
        ch.source_latch = (ch.source_latch & mask) | (u32::from(value) << shift);
    }

    pub fn set_dest(&mut self, index: usize, shift: u32, value: u8) {
        let ch = &mut self.channels[index];
        let mask = !(0xFFu32 << shift);
        ch.dest_latch = (ch.dest_latch & mask) | (u32::from(value) << shift);
    }

    pub fn set_count_low(&mut self, index: usize, value: u8) {
        let ch = &mut self.channels[index];
        ch.count_latch = (ch.count_latch & 0xFF00) | u16::from(value);
    }

    pub fn set_count_high(&mut self, index: usize, value: u8) {
        let ch = &mut self.channels[index];
        ch.count_latch = (ch.count_latch & 0x00FF) | (u16::from(value) << 8);
    }

    #[must_use]
    pub fn control(&self, index: usize) -> u16 {
        self.channels[index].control
    }

    pub fn set_control(&mut self, index: usize, value: u16) {
        self.channels[index].control = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_channel(dma: &mut Dma, index: usize, count: u16, control: u16) {
        dma.set_count_low(index, count as u8);
        dma.set_count_high(index, (count >> 8) as u8);
        dma.set_control(index, control);
    }

    #[test]
    fn immediate_dma_copies_the_full_count_in_one_call() {
        let mut dma = Dma::default();
        dma.set_source(0, 0, 0x00);
        dma.set_source(0, 8, 0x02); // source = 0x02000000
        dma.set_dest(0, 0, 0x00);
        dma.set_dest(0, 8, 0x03); // dest = 0x03000000
        armed_channel(&mut dma, 0, 4, 0x8000); // enable, immediate, halfword

        let out = dma.run_triggered(DmaTiming::Immediate);
        assert_eq!(out.units.len(), 4);
        assert_eq!(out.units[0].source, 0x0200_0000);
        assert_eq!(out.units[3].source, 0x0200_0006);
    }

    #[test]
    fn non_repeat_channel_clears_its_own_enable_bit() {
        let mut dma = Dma::default();
        armed_channel(&mut dma, 0, 1, 0x8000);
        dma.run_triggered(DmaTiming::Immediate);
        assert_eq!(dma.control(0) & 0x8000, 0);
    }

    #[test]
    fn repeat_channel_stays_enabled_for_next_trigger() {
        let mut dma = Dma::default();
        armed_channel(&mut dma, 0, 1, 0x8000 | 0x0200 | 0x1000); // enable, repeat, hblank
        dma.run_triggered(DmaTiming::HBlank);
        assert_eq!(dma.control(0) & 0x8000, 0x8000);

        let out = dma.run_triggered(DmaTiming::HBlank);
        assert_eq!(out.units.len(), 1);
    }

    #[test]
    fn zero_count_latch_means_maximum_count() {
        let mut dma = Dma::default();
        armed_channel(&mut dma, 3, 0, 0x8000);
        let out = dma.run_triggered(DmaTiming::Immediate);
        assert_eq!(out.units.len(), 0x1_0000);
    }

    #[test]
    fn fifo_refill_always_transfers_four_words_with_fixed_destination() {
        let mut dma = Dma::default();
        dma.set_control(1, 0x8000);
        let units = dma.trigger_fifo_refill(1);
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|u| u.word));
        assert!(units.iter().all(|u| u.dest == units[0].dest));
    }
}
