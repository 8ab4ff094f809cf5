//! # GBA System
//!
//! This module contains the [`Gba`] struct which represents the entire
//! Game Boy Advance system and ties together all components.
//!
//! ## System Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                        Game Boy Advance System                              │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                                                                             │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                         ARM7TDMI CPU                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐               │   │
//! │  │   │Registers│  │  CPSR   │  │Pipeline │  │  ALU    │               │   │
//! │  │   │ R0-R15  │  │  SPSR   │  │ 2-stage │  │Shifter  │               │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘               │   │
//! │  └────────────────────────────────┬────────────────────────────────────┘   │
//! │                                   │                                        │
//! │                                   ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                           Memory Bus                                │   │
//! │  └───┬─────────┬─────────┬─────────┬─────────┬─────────┬─────────┬────┘   │
//! │      │         │         │         │         │         │         │        │
//! │      ▼         ▼         ▼         ▼         ▼         ▼         ▼        │
//! │  ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐   │
//! │  │ BIOS  │ │ EWRAM │ │ IWRAM │ │  I/O  │ │Palette│ │ VRAM  │ │  ROM  │   │
//! │  │ 16KB  │ │ 256KB │ │ 32KB  │ │  Regs │ │  1KB  │ │ 96KB  │ │ 32MB  │   │
//! │  │0x0000 │ │0x0200 │ │0x0300 │ │0x0400 │ │0x0500 │ │0x0600 │ │0x0800 │   │
//! │  └───────┘ └───────┘ └───────┘ └───────┘ └───────┘ └───────┘ └───────┘   │
//! │                          │                                                │
//! │                          ▼                                                │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                      I/O Registers (0x04000000)                     │   │
//! │  │  ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐   │   │
//! │  │  │ LCD  │ │Sound │ │ DMA  │ │Timers│ │Serial│ │Keypad│ │  IRQ │   │   │
//! │  │  └──────┘ └──────┘ └──────┘ └──────┘ └──────┘ └──────┘ └──────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────────┘   │
//! │                                                                             │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Boot path
//!
//! [`Gba::init`] constructs the system with a zeroed BIOS and no cartridge;
//! nothing runs until a real image is loaded. A host then calls
//! [`Gba::load_bios`] and/or [`Gba::load_rom`] before the first
//! [`Gba::run_frame`]. If no real BIOS image is available, [`Gba::skip_bios`]
//! puts the CPU directly at the cartridge entry point with the stack
//! pointers the BIOS would have set up, and patches a small HLE trampoline
//! into the BIOS region so that `SWI`/hardware IRQs still have somewhere to
//! return through.

use crate::bus::Bus;
use crate::cartridge::SaveType;
use crate::cartridge_header::CartridgeHeader;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::hardware::internal_memory::InternalMemory;
use crate::cpu::hardware::keypad::Key;
use crate::cpu::hardware::lcd::Color;
use crate::cpu::registers::REG_SP;
use crate::error::{EmuError, Result};

/// Size in bytes of the BIOS region (`0x0000_0000..=0x0000_3FFF`).
const BIOS_SIZE: usize = 0x0000_4000;

/// Largest cartridge ROM the bus's mirroring scheme can address.
const MAX_ROM_SIZE: usize = 32 * 1024 * 1024;

/// Cartridge entry point the BIOS would normally branch to once boot is done.
const ROM_ENTRY_POINT: u32 = 0x0800_0000;

/// `(offset in BIOS, little-endian ARM word)` pairs making up the HLE IRQ
/// trampoline installed by [`Gba::skip_bios`].
///
/// At `0x18` (the IRQ exception vector) a branch lands at `0x128`, which
/// saves the scratch registers, reads the handler address games install at
/// `[0x03FFFFFC]`, calls it with `LR` pointing back to the `LDMFD`/`SUBS`
/// pair, and returns from the exception the way the real BIOS does.
const HLE_IRQ_TRAMPOLINE: [(usize, u32); 7] = [
    (0x018, 0xEA00_0042), // B 0x128
    (0x128, 0xE92D_500F), // STMFD SP!, {R0-R3,R12,LR}
    (0x12C, 0xE3A0_0301), // MOV R0, #0x04000000
    (0x130, 0xE28F_E000), // ADD LR, PC, #0
    (0x134, 0xE510_F004), // LDR PC, [R0, #-4]
    (0x138, 0xE8BD_500F), // LDMFD SP!, {R0-R3,R12,LR}
    (0x13C, 0xE25E_F004), // SUBS PC, LR, #4
];

/// The complete Game Boy Advance system: CPU, bus, and every memory-mapped
/// peripheral, driven one frame at a time.
pub struct Gba {
    pub cpu: Arm7tdmi,

    /// Parsed cartridge header, set once [`Gba::load_rom`] succeeds.
    pub cartridge_header: Option<CartridgeHeader>,

    /// BIOS image currently installed, kept so a later `load_rom` can
    /// reconstruct memory without losing it.
    last_bios: [u8; BIOS_SIZE],

    /// ROM image currently installed, kept so a later `load_bios` can
    /// reconstruct memory without losing it.
    last_rom: Vec<u8>,
}

impl Gba {
    /// Builds the system with an empty BIOS and no cartridge loaded.
    ///
    /// Construction is infallible: everything that can fail (a malformed
    /// ROM header, a wrongly-sized BIOS image, an oversized ROM) is reported
    /// by [`Gba::load_bios`]/[`Gba::load_rom`] instead.
    #[must_use]
    pub fn init() -> Self {
        let last_bios = [0u8; BIOS_SIZE];
        let last_rom = Vec::new();
        let memory = InternalMemory::new(last_bios, &last_rom);
        let bus = Bus::with_memory(memory);

        Self {
            cpu: Arm7tdmi::new(bus),
            cartridge_header: None,
            last_bios,
            last_rom,
        }
    }

    /// Installs a 16 KiB BIOS image, rebuilding memory on top of whatever
    /// ROM is already loaded.
    ///
    /// # Errors
    ///
    /// Returns [`EmuError::InvalidBiosSize`] if `bios` isn't exactly 16 KiB.
    pub fn load_bios(&mut self, bios: &[u8]) -> Result<()> {
        let bios: [u8; BIOS_SIZE] = bios
            .try_into()
            .map_err(|_| EmuError::InvalidBiosSize(bios.len()))?;

        self.last_bios = bios;
        self.rebuild_memory();
        Ok(())
    }

    /// Installs a cartridge ROM, rebuilding memory on top of whatever BIOS
    /// is already loaded. Returns the save type the cartridge interface
    /// detected from the header/image.
    ///
    /// # Errors
    ///
    /// Returns [`EmuError::RomTooLarge`] if `rom` exceeds 32 MiB, or
    /// [`EmuError::InvalidCartridgeHeader`] if the header checksum doesn't
    /// match.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<SaveType> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(EmuError::RomTooLarge(rom.len()));
        }

        let header = CartridgeHeader::new(rom)?;

        self.last_rom = rom.to_vec();
        self.rebuild_memory();
        self.cartridge_header = Some(header);

        Ok(self.cpu.bus.internal_memory.cartridge.save_type())
    }

    /// Rebuilds the bus's internal memory from whichever BIOS/ROM images are
    /// currently held, preserving the CPU's register state.
    ///
    /// Note: reconstructing memory resets cartridge save state (Flash/SRAM
    /// contents, GPIO/RTC pins). Calling `load_rom` a second time mid-game
    /// is not supported by this design.
    fn rebuild_memory(&mut self) {
        let memory = InternalMemory::new(self.last_bios, &self.last_rom);
        self.cpu.bus.internal_memory = memory;
    }

    /// Skips the BIOS boot sequence: sets System mode, installs the stack
    /// pointers the BIOS would have, points the PC at the cartridge entry,
    /// and patches a minimal HLE IRQ trampoline into the BIOS region.
    pub fn skip_bios(&mut self) {
        self.cpu.swap_mode(Mode::System);
        self.cpu.registers.set_register_at(REG_SP, 0x0300_7F00);
        self.cpu.registers.set_program_counter(ROM_ENTRY_POINT);

        for (offset, word) in HLE_IRQ_TRAMPOLINE {
            self.cpu.bus.internal_memory.patch_bios_word(offset, word);
        }
    }

    /// Advances the system by exactly one 228-scanline frame.
    ///
    /// Returns `true` once VBlank starts and the framebuffer is ready to
    /// present; the caller drives pacing and input polling between calls.
    pub fn run_frame(&mut self) -> bool {
        while !self.cpu.step() {}
        true
    }

    /// Marks `key` as held down, raising a keypad IRQ if `KEYCNT` asks for one.
    pub fn press(&mut self, key: Key) {
        self.cpu.bus.press_key(key);
    }

    /// Marks `key` as released.
    pub fn release(&mut self, key: Key) {
        self.cpu.bus.release_key(key);
    }

    /// The 240x160 framebuffer, one 15-bit BGR color per pixel.
    #[must_use]
    pub fn framebuffer(&self) -> &[[Color; 240]; 160] {
        self.cpu.bus.framebuffer()
    }

    /// The stereo sample ring the audio mixer writes into.
    #[must_use]
    pub fn audio_ring(&self) -> &std::collections::VecDeque<(i16, i16)> {
        self.cpu.bus.audio_ring()
    }
}

impl Default for Gba {
    fn default() -> Self {
        Self::init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_rom() -> Vec<u8> {
        let mut data = vec![0u8; 0x0E4];
        data[0x0A0..0x0AC].copy_from_slice(b"TESTGAME1234");
        data[0x0AC..0x0B0].copy_from_slice(b"ABCD");
        data[0x0B0..0x0B2].copy_from_slice(b"01");
        let checksum = data[0xA0..0xBD]
            .iter()
            .fold(0u8, |acc, &item| acc.wrapping_sub(item))
            .wrapping_sub(0x19);
        data[0xBD] = checksum;
        data
    }

    #[test]
    fn init_does_not_panic_and_has_no_cartridge() {
        let gba = Gba::init();
        assert!(gba.cartridge_header.is_none());
    }

    #[test]
    fn load_bios_rejects_wrong_size() {
        let mut gba = Gba::init();
        assert!(matches!(
            gba.load_bios(&[0u8; 10]),
            Err(EmuError::InvalidBiosSize(10))
        ));
    }

    #[test]
    fn load_bios_accepts_exact_size() {
        let mut gba = Gba::init();
        assert!(gba.load_bios(&[0u8; BIOS_SIZE]).is_ok());
    }

    #[test]
    fn load_rom_rejects_oversized_image() {
        let mut gba = Gba::init();
        let oversized = vec![0u8; MAX_ROM_SIZE + 1];
        assert!(matches!(
            gba.load_rom(&oversized),
            Err(EmuError::RomTooLarge(_))
        ));
    }

    #[test]
    fn load_rom_rejects_bad_header() {
        let mut gba = Gba::init();
        let mut data = valid_rom();
        data[0xBD] ^= 0xFF;
        assert!(gba.load_rom(&data).is_err());
    }

    #[test]
    fn load_rom_parses_header_and_reports_save_type() {
        let mut gba = Gba::init();
        let save_type = gba.load_rom(&valid_rom()).unwrap();
        assert_eq!(gba.cartridge_header.as_ref().unwrap().game_code, "ABCD");
        assert_eq!(save_type, SaveType::Flash128K);
    }

    #[test]
    fn skip_bios_sets_system_mode_and_entry_point() {
        let mut gba = Gba::init();
        gba.skip_bios();
        assert_eq!(gba.cpu.cpsr.mode(), Mode::System);
        assert_eq!(gba.cpu.registers.program_counter(), ROM_ENTRY_POINT as usize);
    }

    #[test]
    fn skip_bios_patches_irq_trampoline() {
        let mut gba = Gba::init();
        gba.skip_bios();
        assert_eq!(gba.cpu.bus.internal_memory.read_at(0x18), 0x42);
        assert_eq!(gba.cpu.bus.internal_memory.read_at(0x19), 0x00);
        assert_eq!(gba.cpu.bus.internal_memory.read_at(0x1A), 0x00);
        assert_eq!(gba.cpu.bus.internal_memory.read_at(0x1B), 0xEA);
    }

    #[test]
    fn press_and_release_round_trip_through_the_bus() {
        let mut gba = Gba::init();
        gba.press(Key::Start);
        assert_ne!(gba.cpu.bus.read_raw(0x0400_0130) & 0x0008, 0x0008);
        gba.release(Key::Start);
        assert_eq!(gba.cpu.bus.read_raw(0x0400_0130) & 0x0008, 0x0008);
    }
}
