//! Hardware timers.
//!
//! Four independent 16-bit counters, each optionally cascaded from the one
//! before it. A non-cascade timer accumulates CPU cycles against a prescaler
//! and increments its counter whenever the accumulator rolls over; a cascade
//! timer instead increments once per overflow of its predecessor. Overflow
//! reloads the counter from its latch, optionally raises an IF bit, and
//! notifies the audio mixer so FIFO-driven channels can pop a sample.
//!
//! # Registers
//!
//! | Register  | Bits    | Meaning                                     |
//! |-----------|---------|----------------------------------------------|
//! | `TMxCNT_L`| 0-15    | Reload value (write) / live counter (read)    |
//! | `TMxCNT_H`| 0-1     | Prescaler select: 1, 64, 256, 1024 cycles     |
//! | `TMxCNT_H`| 2       | Cascade (ignore prescaler, count on TMx-1 ovf)|
//! | `TMxCNT_H`| 6       | IRQ enable                                    |
//! | `TMxCNT_H`| 7       | Enable (start/stop)                           |

use serde::{Deserialize, Serialize};

const PRESCALER_CYCLES: [u32; 4] = [1, 64, 256, 1024];

#[derive(Default, Serialize, Deserialize)]
struct Timer {
    reload: u16,
    counter: u16,
    control: u16,
    accumulator: u32,
    was_enabled: bool,
}

impl Timer {
    fn enabled(&self) -> bool {
        self.control & 0x80 != 0
    }

    fn cascade(&self) -> bool {
        self.control & 0x04 != 0
    }

    fn irq_enabled(&self) -> bool {
        self.control & 0x40 != 0
    }

    fn prescaler(&self) -> u32 {
        PRESCALER_CYCLES[(self.control & 0x03) as usize]
    }

    /// Runs on the rising edge of the enable bit: reload. Detects the edge
    /// itself so callers only need to write the control register.
    fn sync_enable_edge(&mut self) {
        let now = self.enabled();
        if now && !self.was_enabled {
            self.counter = self.reload;
            self.accumulator = 0;
        }
        self.was_enabled = now;
    }

    /// Increments the counter by one; returns true on 16-bit overflow, in
    /// which case the counter has already been reloaded.
    fn tick_once(&mut self) -> bool {
        let (next, overflowed) = self.counter.overflowing_add(1);
        if overflowed {
            self.counter = self.reload;
            true
        } else {
            self.counter = next;
            false
        }
    }

    /// Runs `cycles` worth of the prescaler for a non-cascade timer; returns
    /// the number of overflows observed (almost always 0 or 1).
    fn run_cycles(&mut self, cycles: u32) -> u32 {
        if !self.enabled() || self.cascade() {
            return 0;
        }

        let prescaler = self.prescaler();
        self.accumulator += cycles;
        let mut overflows = 0;
        while self.accumulator >= prescaler {
            self.accumulator -= prescaler;
            if self.tick_once() {
                overflows += 1;
            }
        }
        overflows
    }
}

#[derive(Default)]
pub struct TimerOverflowOutput {
    /// Timer index (0..=3) that overflowed, for each overflow raised this step.
    pub overflowed_timers: Vec<u8>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct Timers {
    timers: [Timer; 4],
}

impl Timers {
    /// Runs the cycle-accumulator for the non-cascade timers and walks the
    /// cascade chain for any that overflow. Returns every timer that
    /// overflowed this step, in ascending index order, regardless of that
    /// timer's IRQ-enable bit: the audio mixer must see every overflow, and
    /// it's up to the caller to consult [`Self::irq_enabled`] before raising
    /// an IF bit for one.
    pub fn run(&mut self, cycles: u32) -> TimerOverflowOutput {
        for timer in &mut self.timers {
            timer.sync_enable_edge();
        }

        let mut overflowed_timers = Vec::new();

        for i in 0..4 {
            if self.timers[i].cascade() {
                continue;
            }
            let overflows = self.timers[i].run_cycles(cycles);
            if overflows == 0 {
                continue;
            }
            overflowed_timers.push(i as u8);
            self.cascade_from(i, overflows, &mut overflowed_timers);
        }

        TimerOverflowOutput { overflowed_timers }
    }

    /// Whether `index` has its IRQ-enable bit set, for the caller to decide
    /// whether an overflow should raise an IF bit (it always notifies the
    /// audio mixer regardless).
    #[must_use]
    pub fn irq_enabled(&self, index: usize) -> bool {
        self.timers[index].irq_enabled()
    }

    /// Walks the cascade chain starting at the timer right after `from`,
    /// incrementing once per overflow of the timer before it, stopping at
    /// the first non-cascade timer. Appends every cascaded overflow's index
    /// to `overflowed_timers` so cascade timers can raise IRQs and notify
    /// the audio mixer the same as a directly-clocked timer.
    fn cascade_from(&mut self, from: usize, mut overflows: u32, overflowed_timers: &mut Vec<u8>) {
        let mut next = from + 1;
        while next < 4 && overflows > 0 {
            self.timers[next].sync_enable_edge();
            if !self.timers[next].enabled() || !self.timers[next].cascade() {
                break;
            }

            let mut chained_overflows = 0;
            for _ in 0..overflows {
                if self.timers[next].tick_once() {
                    chained_overflows += 1;
                }
            }

            if chained_overflows > 0 {
                overflowed_timers.push(next as u8);
            }

            overflows = chained_overflows;
            next += 1;
        }
    }

    #[must_use]
    pub fn counter(&self, index: usize) -> u16 {
        self.timers[index].counter
    }

    pub fn set_reload_low(&mut self, index: usize, value: u8) {
        let reload = self.timers[index].reload;
        self.timers[index].reload = (reload & 0xFF00) | u16::from(value);
    }

    pub fn set_reload_high(&mut self, index: usize, value: u8) {
        let reload = self.timers[index].reload;
        self.timers[index].reload = (reload & 0x00FF) | (u16::from(value) << 8);
    }

    #[must_use]
    pub fn reload_low(&self, index: usize) -> u8 {
        self.timers[index].reload as u8
    }

    #[must_use]
    pub fn reload_high(&self, index: usize) -> u8 {
        (self.timers[index].reload >> 8) as u8
    }

    #[must_use]
    pub fn control(&self, index: usize) -> u16 {
        self.timers[index].control
    }

    pub fn set_control(&mut self, index: usize, value: u16) {
        self.timers[index].control = value & 0x00C7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_reloads_on_enable_rising_edge() {
        let mut timers = Timers::default();
        timers.set_reload_low(0, 0xFE);
        timers.set_reload_high(0, 0xFF);
        timers.set_control(0, 0x80); // enable, prescaler=1

        timers.run(1);
        assert_eq!(timers.counter(0), 0xFFFF);
    }

    #[test]
    fn cascade_timer_increments_on_predecessor_overflow() {
        let mut timers = Timers::default();
        timers.set_reload_low(0, 0xFE);
        timers.set_reload_high(0, 0xFF);
        timers.set_control(0, 0x80); // enable, prescaler=1

        timers.set_control(1, 0x84); // enable, cascade

        timers.run(4);
        assert_eq!(timers.counter(1), 2);
    }

    #[test]
    fn overflow_raises_irq_flag_when_enabled() {
        let mut timers = Timers::default();
        timers.set_reload_low(0, 0xFF);
        timers.set_reload_high(0, 0xFF);
        timers.set_control(0, 0xC0); // enable, IRQ enable, prescaler=1

        let out = timers.run(1);
        assert_eq!(out.overflowed_timers, vec![0]);
    }

    #[test]
    fn overflow_is_reported_even_when_irq_disabled() {
        let mut timers = Timers::default();
        timers.set_reload_low(0, 0xFF);
        timers.set_reload_high(0, 0xFF);
        timers.set_control(0, 0x80); // enable, IRQ disabled, prescaler=1

        let out = timers.run(1);
        assert_eq!(out.overflowed_timers, vec![0]);
        assert!(!timers.irq_enabled(0));
    }

    #[test]
    fn cascade_timer_overflow_is_reported_to_caller() {
        let mut timers = Timers::default();
        timers.set_reload_low(0, 0xFF);
        timers.set_reload_high(0, 0xFF);
        timers.set_control(0, 0x80); // enable, prescaler=1

        timers.set_control(1, 0xC4); // enable, cascade, IRQ enable
        timers.set_reload_low(1, 0xFF);
        timers.set_reload_high(1, 0xFF);

        let out = timers.run(1);
        assert_eq!(out.overflowed_timers, vec![0, 1]);
    }

    #[test]
    fn non_cascade_timer_is_unaffected_by_sibling_overflow() {
        let mut timers = Timers::default();
        timers.set_reload_low(0, 0xFF);
        timers.set_reload_high(0, 0xFF);
        timers.set_control(0, 0x80);
        timers.set_control(1, 0x80); // enabled but not cascading

        timers.run(1);
        assert_eq!(timers.counter(1), 0);
    }
}
