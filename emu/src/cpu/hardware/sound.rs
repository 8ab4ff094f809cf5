//! APU: four PSG channels plus two Direct Sound FIFOs, mixed down to a
//! stereo ring buffer for the host sink.
//!
//! PSG channels advance by cycle budget each scanline. An 8-step frame
//! sequencer running at 512 Hz (every `CPU_CLOCK / 512` cycles) ticks
//! length counters on even steps, the channel 1 sweep every 4th step, and
//! envelopes every 8th step — the usual DMG/GBA schedule. Each FIFO is a
//! 32-slot ring of signed 8-bit samples; a `push` while the FIFO is full
//! first resets it, a documented hardware quirk rather than a bug. On
//! timer overflow the mixer pops one sample from each FIFO whose source
//! timer matches and, if the FIFO then sits below half capacity, signals
//! the caller to trigger a FIFO-refill DMA.
//!
//! # Registers
//!
//! | Register              | Purpose                                   |
//! |------------------------|--------------------------------------------|
//! | `SOUND1CNT_L/H/X`      | Channel 1: sweep, duty/length/envelope, freq |
//! | `SOUND2CNT_L/H`        | Channel 2: duty/length/envelope, freq     |
//! | `SOUND3CNT_L/H/X`      | Channel 3: wave enable/length/volume, freq |
//! | `SOUND4CNT_L/H`        | Channel 4: length/envelope, noise freq/width |
//! | `SOUNDCNT_L/H/X`       | Master volume/routing, FIFO routing, master enable |
//! | `SOUNDBIAS`            | DC bias added before the final clamp      |
//! | `WAVE_RAM`             | 32 four-bit wave samples                  |
//! | `FIFO_A` / `FIFO_B`    | Direct Sound sample FIFOs                 |

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

const CPU_CLOCK: u32 = 1 << 24;
const FRAME_SEQUENCER_PERIOD: u32 = CPU_CLOCK / 512;
const FIFO_CAPACITY: usize = 32;
const AUDIO_RING_CAPACITY: usize = 4096;

const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 0],
];

#[derive(Default, Serialize, Deserialize)]
struct SquareChannel {
    has_sweep: bool,
    duty_pos: u8,
    freq_timer: i32,
    envelope_timer: u8,
    envelope_volume: u8,
    length_counter: u16,
    enabled: bool,
    sweep_timer: u8,
    sweep_shadow_freq: u16,
}

impl SquareChannel {
    fn period(frequency: u16) -> i32 {
        (2048 - i32::from(frequency)) * 4
    }

    fn trigger(&mut self, frequency: u16, length: u16, full_length: bool) {
        self.enabled = true;
        self.freq_timer = Self::period(frequency);
        self.length_counter = if full_length { 64 } else { length };
        self.sweep_shadow_freq = frequency;
        self.sweep_timer = 0;
    }

    fn step_cycles(&mut self, cycles: u32, frequency: u16) {
        self.freq_timer -= cycles as i32;
        while self.freq_timer <= 0 {
            self.freq_timer += Self::period(frequency);
            self.duty_pos = (self.duty_pos + 1) % 8;
        }
    }

    fn amplitude(&self, duty: u8) -> i16 {
        if !self.enabled || self.length_counter == 0 {
            return 0;
        }
        let bit = DUTY_TABLE[usize::from(duty)][usize::from(self.duty_pos)];
        if bit == 1 {
            i16::from(self.envelope_volume)
        } else {
            0
        }
    }

    fn clock_length(&mut self) {
        if self.length_counter > 0 {
            self.length_counter -= 1;
            if self.length_counter == 0 {
                self.enabled = false;
            }
        }
    }

    fn clock_envelope(&mut self, period: u8, increase: bool, initial_volume: u8) {
        if period == 0 {
            return;
        }
        self.envelope_timer += 1;
        if self.envelope_timer >= period {
            self.envelope_timer = 0;
            if increase && self.envelope_volume < 15 {
                self.envelope_volume += 1;
            } else if !increase && self.envelope_volume > 0 {
                self.envelope_volume -= 1;
            }
        }
        if self.envelope_volume == 0 && initial_volume == 0 {
            self.envelope_volume = 0;
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct WaveChannel {
    position: u8,
    freq_timer: i32,
    length_counter: u16,
    enabled: bool,
}

impl WaveChannel {
    fn period(frequency: u16) -> i32 {
        (2048 - i32::from(frequency)) * 2
    }

    fn trigger(&mut self, frequency: u16, length: u16) {
        self.enabled = true;
        self.freq_timer = Self::period(frequency);
        self.length_counter = if length == 0 { 256 } else { length };
        self.position = 0;
    }

    fn step_cycles(&mut self, cycles: u32, frequency: u16) {
        self.freq_timer -= cycles as i32;
        while self.freq_timer <= 0 {
            self.freq_timer += Self::period(frequency);
            self.position = (self.position + 1) % 32;
        }
    }

    fn clock_length(&mut self) {
        if self.length_counter > 0 {
            self.length_counter -= 1;
            if self.length_counter == 0 {
                self.enabled = false;
            }
        }
    }
}

const NOISE_DIVISORS: [i32; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

#[derive(Serialize, Deserialize)]
struct NoiseChannel {
    lfsr: u16,
    freq_timer: i32,
    envelope_timer: u8,
    envelope_volume: u8,
    length_counter: u16,
    enabled: bool,
}

impl Default for NoiseChannel {
    fn default() -> Self {
        Self {
            lfsr: 0x7FFF,
            freq_timer: 0,
            envelope_timer: 0,
            envelope_volume: 0,
            length_counter: 0,
            enabled: false,
        }
    }
}

impl NoiseChannel {
    fn period(divisor_code: u8, shift: u8) -> i32 {
        NOISE_DIVISORS[usize::from(divisor_code)] << shift
    }

    fn trigger(&mut self, length: u16, full_length: bool) {
        self.enabled = true;
        self.lfsr = 0x7FFF;
        self.length_counter = if full_length { 64 } else { length };
    }

    fn step_cycles(&mut self, cycles: u32, divisor_code: u8, shift: u8, narrow: bool) {
        self.freq_timer -= cycles as i32;
        let period = Self::period(divisor_code, shift).max(1);
        while self.freq_timer <= 0 {
            self.freq_timer += period;
            let bit = (self.lfsr & 1) ^ ((self.lfsr >> 1) & 1);
            self.lfsr = (self.lfsr >> 1) | (bit << 14);
            if narrow {
                self.lfsr = (self.lfsr & !0x40) | (bit << 6);
            }
        }
    }

    fn amplitude(&self) -> i16 {
        if !self.enabled || self.length_counter == 0 {
            return 0;
        }
        if self.lfsr & 1 == 0 {
            i16::from(self.envelope_volume)
        } else {
            0
        }
    }

    fn clock_length(&mut self) {
        if self.length_counter > 0 {
            self.length_counter -= 1;
            if self.length_counter == 0 {
                self.enabled = false;
            }
        }
    }

    fn clock_envelope(&mut self, period: u8, increase: bool) {
        if period == 0 {
            return;
        }
        self.envelope_timer += 1;
        if self.envelope_timer >= period {
            self.envelope_timer = 0;
            if increase && self.envelope_volume < 15 {
                self.envelope_volume += 1;
            } else if !increase && self.envelope_volume > 0 {
                self.envelope_volume -= 1;
            }
        }
    }
}

/// 32-slot ring of signed 8-bit samples. Writing while full resets first.
#[derive(Default, Serialize, Deserialize)]
struct Fifo {
    samples: VecDeque<i8>,
}

impl Fifo {
    fn push_word(&mut self, word: u32) {
        if self.samples.len() + 4 > FIFO_CAPACITY {
            self.samples.clear();
        }
        for i in 0..4 {
            self.samples.push_back((word >> (i * 8)) as i8);
        }
    }

    fn pop(&mut self) -> i8 {
        self.samples.pop_front().unwrap_or(0)
    }

    fn below_half_capacity(&self) -> bool {
        self.samples.len() <= FIFO_CAPACITY / 2
    }
}

/// Per-step output for the caller (which FIFO-refill DMA channels to fire).
#[derive(Default)]
pub struct SoundStepOutput {
    pub refill_fifo_a: bool,
    pub refill_fifo_b: bool,
}

#[derive(Default, Serialize, Deserialize)]
pub struct Sound {
    pub channel1_sweep: u16,
    pub channel1_duty_length_envelope: u16,
    pub channel1_frequency_control: u16,
    pub channel2_duty_length_envelope: u16,
    pub channel2_frequency_control: u16,
    pub channel3_stop_wave_ram_select: u16,
    pub channel3_length_volume: u16,
    pub channel3_frequency_control: u16,
    pub channel4_length_envelope: u16,
    pub channel4_frequency_control: u16,
    pub control_stereo_volume_enable: u16,
    pub control_mixing_dma_control: u16,
    pub control_sound_on_off: u16,
    pub sound_pwm_control: u16,
    pub channel3_wave_pattern_ram: [u8; 16],

    channel1: SquareChannel,
    channel2: SquareChannel,
    channel3: WaveChannel,
    channel4: NoiseChannel,
    fifo_a: Fifo,
    fifo_b: Fifo,
    fifo_a_latch: u32,
    fifo_b_latch: u32,
    fifo_a_latest: i8,
    fifo_b_latest: i8,
    frame_sequencer_accumulator: u32,
    frame_sequencer_step: u8,
    #[serde(skip)]
    audio_ring: VecDeque<(i16, i16)>,
}

impl Sound {
    const fn master_enabled(&self) -> bool {
        self.control_sound_on_off & 0x80 != 0
    }

    /// Advances the PSG channels and frame sequencer by `cycles`, mixes the
    /// result with the current FIFO output, and appends one stereo sample
    /// (there is no separate "sample rate" modeled: one mix per call keeps
    /// this aligned with however often the caller chooses to invoke it,
    /// typically once per scanline-sized chunk).
    pub fn run(&mut self, cycles: u32) {
        if !self.master_enabled() {
            return;
        }

        self.step_frame_sequencer(cycles);

        let ch1_freq = self.channel1_frequency_control & 0x07FF;
        let ch2_freq = self.channel2_frequency_control & 0x07FF;
        let ch3_freq = self.channel3_frequency_control & 0x07FF;
        self.channel1.step_cycles(cycles, ch1_freq);
        self.channel2.step_cycles(cycles, ch2_freq);
        if self.channel3_stop_wave_ram_select & 0x80 != 0 {
            self.channel3.step_cycles(cycles, ch3_freq);
        }

        let noise_settings = self.channel4_frequency_control;
        let divisor_code = (noise_settings & 0x07) as u8;
        let shift = ((noise_settings >> 4) & 0x0F) as u8;
        let narrow = noise_settings & 0x08 != 0;
        self.channel4.step_cycles(cycles, divisor_code, shift, narrow);

        self.mix_and_push();
    }

    fn step_frame_sequencer(&mut self, cycles: u32) {
        self.frame_sequencer_accumulator += cycles;
        while self.frame_sequencer_accumulator >= FRAME_SEQUENCER_PERIOD {
            self.frame_sequencer_accumulator -= FRAME_SEQUENCER_PERIOD;
            self.clock_frame_sequencer_step();
            self.frame_sequencer_step = (self.frame_sequencer_step + 1) % 8;
        }
    }

    fn clock_frame_sequencer_step(&mut self) {
        let step = self.frame_sequencer_step;
        if step % 2 == 0 {
            self.channel1.clock_length();
            self.channel2.clock_length();
            self.channel3.clock_length();
            self.channel4.clock_length();
        }
        if step == 2 || step == 6 {
            self.clock_sweep();
        }
        if step == 7 {
            let env1 = self.channel1_duty_length_envelope;
            self.channel1.clock_envelope(
                ((env1 >> 8) & 0x07) as u8,
                env1 & 0x0800 != 0,
                ((env1 >> 12) & 0x0F) as u8,
            );
            let env2 = self.channel2_duty_length_envelope;
            self.channel2.clock_envelope(
                ((env2 >> 8) & 0x07) as u8,
                env2 & 0x0800 != 0,
                ((env2 >> 12) & 0x0F) as u8,
            );
            let env4 = self.channel4_length_envelope;
            self.channel4
                .clock_envelope(((env4 >> 8) & 0x07) as u8, env4 & 0x0800 != 0);
        }
    }

    fn clock_sweep(&mut self) {
        let sweep = self.channel1_sweep;
        let period = (sweep >> 4) & 0x07;
        if period == 0 {
            return;
        }
        self.channel1.sweep_timer += 1;
        if self.channel1.sweep_timer < period as u8 {
            return;
        }
        self.channel1.sweep_timer = 0;

        let shift = sweep & 0x07;
        let decrease = sweep & 0x08 != 0;
        let delta = self.channel1.sweep_shadow_freq >> shift;
        let new_freq = if decrease {
            self.channel1.sweep_shadow_freq.saturating_sub(delta)
        } else {
            self.channel1.sweep_shadow_freq.saturating_add(delta)
        };
        if new_freq > 2047 {
            self.channel1.enabled = false;
        } else if shift != 0 {
            self.channel1.sweep_shadow_freq = new_freq;
            self.channel1_frequency_control =
                (self.channel1_frequency_control & !0x07FF) | new_freq;
        }
    }

    fn mix_and_push(&mut self) {
        let duty1 = ((self.channel1_duty_length_envelope >> 6) & 0x03) as u8;
        let duty2 = ((self.channel2_duty_length_envelope >> 6) & 0x03) as u8;
        let wave_volume = (self.channel3_length_volume >> 13) & 0x03;
        let wave_shift = match wave_volume {
            0 => None,
            1 => Some(0u8),
            2 => Some(1),
            _ => Some(2),
        };

        let ch1 = i32::from(self.channel1.amplitude(duty1));
        let ch2 = i32::from(self.channel2.amplitude(duty2));
        let ch3 = wave_shift.map_or(0, |shift| {
            if self.channel3.enabled {
                let sample = self.channel3_wave_pattern_ram[usize::from(self.channel3.position / 2)];
                let nibble = if self.channel3.position % 2 == 0 {
                    sample >> 4
                } else {
                    sample & 0x0F
                };
                i32::from(nibble >> shift)
            } else {
                0
            }
        });
        let ch4 = i32::from(self.channel4.amplitude());

        let routing = self.control_stereo_volume_enable;
        let left_vol = i32::from(routing & 0x07);
        let right_vol = i32::from((routing >> 4) & 0x07);

        let left_mask = (routing >> 12) & 0x0F;
        let right_mask = (routing >> 8) & 0x0F;

        let psg_left = Self::route(ch1, ch2, ch3, ch4, left_mask) * (left_vol + 1);
        let psg_right = Self::route(ch1, ch2, ch3, ch4, right_mask) * (right_vol + 1);

        let dsa = i32::from(self.fifo_a_latest);
        let dsb = i32::from(self.fifo_b_latest);
        let dma_ratio_a = if self.control_mixing_dma_control & 0x04 != 0 { 2 } else { 1 };
        let dma_ratio_b = if self.control_mixing_dma_control & 0x08 != 0 { 2 } else { 1 };
        let a_left = if self.control_mixing_dma_control & 0x0100 != 0 { dsa } else { 0 };
        let a_right = if self.control_mixing_dma_control & 0x0200 != 0 { dsa } else { 0 };
        let b_left = if self.control_mixing_dma_control & 0x1000 != 0 { dsb } else { 0 };
        let b_right = if self.control_mixing_dma_control & 0x2000 != 0 { dsb } else { 0 };

        let bias = i32::from(self.sound_pwm_control & 0x3FF);
        let left = bias + psg_left / 4 + a_left * dma_ratio_a + b_left * dma_ratio_b;
        let right = bias + psg_right / 4 + a_right * dma_ratio_a + b_right * dma_ratio_b;

        let left = left.clamp(0, 0x3FF) - 0x200;
        let right = right.clamp(0, 0x3FF) - 0x200;

        if self.audio_ring.len() >= AUDIO_RING_CAPACITY {
            self.audio_ring.pop_front();
        }
        self.audio_ring.push_back((
            i16::try_from(left * 32).unwrap_or(i16::MAX),
            i16::try_from(right * 32).unwrap_or(i16::MAX),
        ));
    }

    fn route(ch1: i32, ch2: i32, ch3: i32, ch4: i32, mask: u16) -> i32 {
        let mut total = 0;
        if mask & 0x1 != 0 {
            total += ch1;
        }
        if mask & 0x2 != 0 {
            total += ch2;
        }
        if mask & 0x4 != 0 {
            total += ch3;
        }
        if mask & 0x8 != 0 {
            total += ch4;
        }
        total
    }

    /// Called when a timer the FIFO is wired to overflows; pops one sample
    /// from the matching FIFO(s) and reports whether either needs a refill.
    pub fn on_timer_overflow(&mut self, timer_index: u8) -> SoundStepOutput {
        let mut output = SoundStepOutput::default();
        let routing = self.control_mixing_dma_control;

        let fifo_a_timer = if routing & 0x0400 != 0 { 1 } else { 0 };
        if timer_index == fifo_a_timer {
            self.fifo_a_latest = self.fifo_a.pop();
            output.refill_fifo_a = self.fifo_a.below_half_capacity();
        }

        let fifo_b_timer = if routing & 0x0800 != 0 { 1 } else { 0 };
        if timer_index == fifo_b_timer {
            self.fifo_b_latest = self.fifo_b.pop();
            output.refill_fifo_b = self.fifo_b.below_half_capacity();
        }

        output
    }

    pub fn push_fifo_a(&mut self, word: u32) {
        self.fifo_a.push_word(word);
    }

    pub fn push_fifo_b(&mut self, word: u32) {
        self.fifo_b.push_word(word);
    }

    /// `FIFO_A`/`FIFO_B` are written one byte at a time by the CPU; the
    /// write only reaches the FIFO once the fourth byte lands.
    pub fn write_fifo_a_byte(&mut self, index: u8, value: u8) {
        self.fifo_a_latch.set_byte(index, value);
        if index == 3 {
            self.push_fifo_a(self.fifo_a_latch);
        }
    }

    pub fn write_fifo_b_byte(&mut self, index: u8, value: u8) {
        self.fifo_b_latch.set_byte(index, value);
        if index == 3 {
            self.push_fifo_b(self.fifo_b_latch);
        }
    }

    pub fn trigger_channel1(&mut self) {
        let duty = self.channel1_duty_length_envelope;
        self.channel1.envelope_volume = ((duty >> 12) & 0x0F) as u8;
        let length = 64 - (duty & 0x3F);
        let full_length = duty & 0x4000 == 0;
        let freq = self.channel1_frequency_control & 0x07FF;
        self.channel1.trigger(freq, length, full_length);
    }

    pub fn trigger_channel2(&mut self) {
        let duty = self.channel2_duty_length_envelope;
        self.channel2.envelope_volume = ((duty >> 12) & 0x0F) as u8;
        let length = 64 - (duty & 0x3F);
        let full_length = duty & 0x4000 == 0;
        let freq = self.channel2_frequency_control & 0x07FF;
        self.channel2.trigger(freq, length, full_length);
    }

    pub fn trigger_channel3(&mut self) {
        let length = 256 - (self.channel3_length_volume & 0xFF);
        let freq = self.channel3_frequency_control & 0x07FF;
        self.channel3.trigger(freq, length);
    }

    pub fn trigger_channel4(&mut self) {
        let env = self.channel4_length_envelope;
        self.channel4.envelope_volume = ((env >> 12) & 0x0F) as u8;
        let length = 64 - (env & 0x3F);
        let full_length = env & 0x4000 == 0;
        self.channel4.trigger(length, full_length);
    }

    #[must_use]
    pub fn audio_ring(&self) -> &VecDeque<(i16, i16)> {
        &self.audio_ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_write_appends_four_samples() {
        let mut fifo = Fifo::default();
        fifo.push_word(0x0403_0201);
        assert_eq!(fifo.samples.len(), 4);
        assert_eq!(fifo.samples[0], 1);
        assert_eq!(fifo.samples[3], 4);
    }

    #[test]
    fn fifo_write_while_full_resets_before_appending() {
        let mut fifo = Fifo::default();
        for _ in 0..8 {
            fifo.push_word(0x0101_0101);
        }
        assert_eq!(fifo.samples.len(), FIFO_CAPACITY);
        fifo.push_word(0x0202_0202);
        assert_eq!(fifo.samples.len(), 4);
        assert_eq!(fifo.samples[0], 2);
    }

    #[test]
    fn fifo_below_half_capacity_triggers_refill_signal() {
        let mut sound = Sound::default();
        sound.control_sound_on_off = 0x80;
        sound.control_mixing_dma_control = 0; // timer 0 for FIFO A
        sound.push_fifo_a(0x0101_0101);
        for _ in 0..3 {
            sound.on_timer_overflow(0);
        }
        let out = sound.on_timer_overflow(0);
        assert!(out.refill_fifo_a);
    }

    #[test]
    fn channel1_trigger_sets_envelope_from_control_register() {
        let mut sound = Sound::default();
        sound.channel1_duty_length_envelope = 0xF000;
        sound.trigger_channel1();
        assert_eq!(sound.channel1.envelope_volume, 15);
        assert!(sound.channel1.enabled);
    }

    #[test]
    fn master_disable_skips_mixing_entirely() {
        let mut sound = Sound::default();
        sound.control_sound_on_off = 0; // master disabled
        sound.run(100);
        assert!(sound.audio_ring().is_empty());
    }
}
