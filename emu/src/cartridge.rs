//! Game Pak cartridge: ROM image, GPIO pins (RTC), and the Flash/SRAM save
//! state machine.
//!
//! This is the one collaborator the core reaches out to rather than owning
//! outright: [`InternalMemory`](crate::cpu::hardware::internal_memory::InternalMemory)
//! only knows that `0x0800_0000..=0x0FFF_FFFF` is backed by something exposing
//! byte reads/writes. Save-type detection and chip emulation live entirely in
//! here so the bus dispatch never needs to know which one is in use.
//!
//! # Address layout (relative to `0x0800_0000`)
//!
//! | Offset range              | Contents                                   |
//! |----------------------------|--------------------------------------------|
//! | `0x000_0000-0x5FF_FFFF`    | ROM, mirrored across the three wait states  |
//! | `0x600_0000-0x601_FFFF`    | Flash/SRAM save memory                      |
//! | elsewhere                  | open bus                                    |
//!
//! # Flash Memory State Machine
//!
//! The Flash save memory uses a command-based state machine ([`FlashState`]) to handle:
//! - **ID Mode**: Returns manufacturer/device ID for detection
//! - **Erase**: Chip erase or 4KB sector erase
//! - **Write**: Single byte programming (can only clear bits)
//! - **Bank Select**: Switch between 64KB banks (for 128KB flash)
//!
//! Commands use a specific sequence written to addresses `0x5555` and `0x2AAA`.
//!
//! # GPIO (RTC Support)
//!
//! ROM offsets `0xC4-0xC9` are wired to GPIO pins used by some games (e.g.
//! Pokemon) for Real-Time Clock communication:
//! - `0xC4`: Data register (pin state)
//! - `0xC6`: Direction register (1=output, 0=input)
//! - `0xC8`: Control register (GPIO enable)

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

const ROM_MIRROR_SIZE: u32 = 0x0200_0000;
const ROM_REGION_SIZE: u32 = 0x0600_0000;
const FLASH_BASE: u32 = 0x0600_0000;
const FLASH_SIZE: u32 = 0x0002_0000;

/// Flash memory state for command handling.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FlashState {
    #[default]
    Ready,
    Command1,      // Received 0xAA at 0x5555
    Command2,      // Received 0x55 at 0x2AAA
    IdMode,        // ID mode - reads return manufacturer/device ID
    EraseCommand,  // Received 0x80 - waiting for erase sequence
    EraseCommand1, // Erase: received 0xAA at 0x5555
    EraseCommand2, // Erase: received 0x55 at 0x2AAA, waiting for erase type
    BankSelect,    // Waiting for bank number (for 128KB flash)
    WriteCommand,  // Ready to write a byte
}

/// Detected cartridge save type, reported back to the host by `load_rom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveType {
    /// No save memory identified; Flash is still present but may go unused.
    None,
    Flash128K,
}

#[derive(Serialize, Deserialize)]
pub struct Cartridge {
    rom: Vec<u8>,
    sram: Vec<u8>,
    flash_state: FlashState,
    flash_bank: u8,
    gpio_data: u16,
    gpio_direction: u16,
    gpio_control: u16,
}

impl Cartridge {
    #[must_use]
    pub fn new(rom: &[u8]) -> Self {
        Self {
            rom: rom.to_vec(),
            sram: vec![0xFF; FLASH_SIZE as usize], // erased state
            flash_state: FlashState::Ready,
            flash_bank: 0,
            gpio_data: 0,
            gpio_direction: 0,
            gpio_control: 1,
        }
    }

    #[must_use]
    pub const fn save_type(&self) -> SaveType {
        SaveType::Flash128K
    }

    /// Read a byte at `addr`, relative to `0x0800_0000`.
    #[must_use]
    pub fn read8(&self, addr: u32) -> u8 {
        if addr < ROM_REGION_SIZE {
            self.read_rom((addr % ROM_MIRROR_SIZE) as usize)
        } else if addr < FLASH_BASE + FLASH_SIZE {
            self.read_flash((addr - FLASH_BASE) as usize)
        } else {
            0xFF
        }
    }

    pub fn write8(&mut self, addr: u32, value: u8) {
        if addr < ROM_REGION_SIZE {
            self.write_rom_region((addr % ROM_MIRROR_SIZE) as usize, value);
        } else if addr < FLASH_BASE + FLASH_SIZE {
            self.write_flash((addr - FLASH_BASE) as usize, value);
        } else {
            tracing::debug!("write to unused cartridge offset 0x{addr:07X} = 0x{value:02X}");
        }
    }

    fn read_rom(&self, offset: usize) -> u8 {
        if (0xC4..=0xC9).contains(&offset) {
            return match offset {
                0xC4 => self.gpio_data.get_byte(0),
                0xC5 => self.gpio_data.get_byte(1),
                0xC6 => self.gpio_direction.get_byte(0),
                0xC7 => self.gpio_direction.get_byte(1),
                0xC8 => self.gpio_control.get_byte(0),
                0xC9 => self.gpio_control.get_byte(1),
                _ => unreachable!(),
            };
        }

        if offset < self.rom.len() {
            self.rom[offset]
        } else {
            // The Game Pak bus is 16-bit: reading past the end of the cartridge
            // image doesn't overwrite AD0-15, which still carries the low 16
            // bits of the (halfword) address. See gbatek's GamePak Bus section.
            #[allow(clippy::cast_possible_truncation)]
            {
                (((offset >> 1) & 0xFFFF) as u16).get_byte((offset & 0b1) as u8)
            }
        }
    }

    fn write_rom_region(&mut self, offset: usize, value: u8) {
        if (0xC4..=0xC9).contains(&offset) {
            match offset {
                0xC4 => self.gpio_data.set_byte(0, value),
                0xC5 => self.gpio_data.set_byte(1, value),
                0xC6 => self.gpio_direction.set_byte(0, value),
                0xC7 => self.gpio_direction.set_byte(1, value),
                0xC8 => self.gpio_control.set_byte(0, value),
                0xC9 => self.gpio_control.set_byte(1, value),
                _ => unreachable!(),
            }
        } else {
            tracing::debug!("write to read-only ROM offset 0x{offset:07X}");
        }
    }

    fn read_flash(&self, offset: usize) -> u8 {
        if self.flash_state == FlashState::IdMode {
            return match offset {
                // Sanyo LE26FV10N1TS (128KB / 1Mbit), same as mGBA uses.
                0x0000 => 0x62,
                0x0001 => 0x13,
                _ => 0xFF,
            };
        }

        let real_offset = (usize::from(self.flash_bank) * 0x1_0000) + (offset & 0xFFFF);
        self.sram.get(real_offset).copied().unwrap_or(0xFF)
    }

    #[allow(clippy::too_many_lines)]
    fn write_flash(&mut self, offset: usize, value: u8) {
        let offset = offset & 0xFFFF;

        match self.flash_state {
            FlashState::Ready => {
                if offset == 0x5555 && value == 0xAA {
                    self.flash_state = FlashState::Command1;
                }
            }
            FlashState::Command1 => {
                self.flash_state = if offset == 0x2AAA && value == 0x55 {
                    FlashState::Command2
                } else {
                    FlashState::Ready
                };
            }
            FlashState::Command2 => {
                if offset == 0x5555 {
                    self.flash_state = match value {
                        0x90 => FlashState::IdMode,
                        0x80 => FlashState::EraseCommand,
                        0xA0 => FlashState::WriteCommand,
                        0xB0 => FlashState::BankSelect,
                        _ => FlashState::Ready,
                    };
                } else {
                    self.flash_state = FlashState::Ready;
                }
            }
            FlashState::IdMode => {
                if value == 0xF0 {
                    self.flash_state = FlashState::Ready;
                } else if offset == 0x5555 && value == 0xAA {
                    self.flash_state = FlashState::Command1;
                }
            }
            FlashState::EraseCommand => {
                self.flash_state = if offset == 0x5555 && value == 0xAA {
                    FlashState::EraseCommand1
                } else {
                    FlashState::Ready
                };
            }
            FlashState::EraseCommand1 => {
                self.flash_state = if offset == 0x2AAA && value == 0x55 {
                    FlashState::EraseCommand2
                } else {
                    FlashState::Ready
                };
            }
            FlashState::EraseCommand2 => {
                if value == 0x10 && offset == 0x5555 {
                    self.sram.fill(0xFF);
                } else if value == 0x30 {
                    let sector_base = (usize::from(self.flash_bank) * 0x1_0000) + (offset & 0xF000);
                    for byte in self
                        .sram
                        .iter_mut()
                        .skip(sector_base)
                        .take(0x1000)
                    {
                        *byte = 0xFF;
                    }
                }
                self.flash_state = FlashState::Ready;
            }
            FlashState::BankSelect => {
                if offset == 0x0000 {
                    self.flash_bank = value & 0x01;
                }
                self.flash_state = FlashState::Ready;
            }
            FlashState::WriteCommand => {
                let real_offset = (usize::from(self.flash_bank) * 0x1_0000) + offset;
                if let Some(byte) = self.sram.get_mut(real_offset) {
                    *byte &= value;
                }
                self.flash_state = FlashState::Ready;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_reads_back_loaded_bytes() {
        let cart = Cartridge::new(&[1, 2, 3, 4]);
        assert_eq!(cart.read8(0), 1);
        assert_eq!(cart.read8(3), 4);
    }

    #[test]
    fn rom_mirrors_across_wait_state_windows() {
        let cart = Cartridge::new(&[1, 2, 3, 4]);
        assert_eq!(cart.read8(0), cart.read8(ROM_MIRROR_SIZE));
        assert_eq!(cart.read8(0), cart.read8(ROM_MIRROR_SIZE * 2));
    }

    #[test]
    fn out_of_range_rom_read_reflects_address_bus() {
        let cart = Cartridge::new(&[]);
        assert_eq!(cart.read8(0x01FF_FFFE), 0xFF);
        assert_eq!(cart.read8(0x01FF_FFFF), 0xFF);
    }

    #[test]
    fn flash_id_mode_returns_manufacturer_and_device_id() {
        let mut cart = Cartridge::new(&[]);
        cart.write8(FLASH_BASE + 0x5555, 0xAA);
        cart.write8(FLASH_BASE + 0x2AAA, 0x55);
        cart.write8(FLASH_BASE + 0x5555, 0x90);

        assert_eq!(cart.read8(FLASH_BASE), 0x62);
        assert_eq!(cart.read8(FLASH_BASE + 1), 0x13);
    }

    #[test]
    fn flash_byte_write_only_clears_bits() {
        let mut cart = Cartridge::new(&[]);
        cart.write8(FLASH_BASE + 0x5555, 0xAA);
        cart.write8(FLASH_BASE + 0x2AAA, 0x55);
        cart.write8(FLASH_BASE + 0x5555, 0xA0);
        cart.write8(FLASH_BASE, 0x0F);

        assert_eq!(cart.read8(FLASH_BASE), 0xFF & 0x0F);
    }

    #[test]
    fn flash_chip_erase_resets_all_bytes() {
        let mut cart = Cartridge::new(&[]);
        cart.sram[10] = 0x00;

        cart.write8(FLASH_BASE + 0x5555, 0xAA);
        cart.write8(FLASH_BASE + 0x2AAA, 0x55);
        cart.write8(FLASH_BASE + 0x5555, 0x80);
        cart.write8(FLASH_BASE + 0x5555, 0xAA);
        cart.write8(FLASH_BASE + 0x2AAA, 0x55);
        cart.write8(FLASH_BASE + 0x5555, 0x10);

        assert_eq!(cart.sram[10], 0xFF);
    }

    #[test]
    fn gpio_registers_round_trip_through_rom_offsets() {
        let mut cart = Cartridge::new(&[0; 0x200]);
        cart.write8(0xC4, 0x05);
        assert_eq!(cart.read8(0xC4), 0x05);
    }
}
