//! GBA ROM header parsing.
//!
//! The first 192 bytes of every cartridge follow a fixed layout (logo,
//! title/code, checksum, boot entry points). `CartridgeHeader::new` reads the
//! whole thing in one pass and validates the header checksum, returning an
//! [`EmuError::InvalidCartridgeHeader`] rather than panicking on anything
//! malformed so a bad ROM never takes the host down with it.

use crate::error::{EmuError, Result};

const HEADER_LEN: usize = 0x0E4;

#[allow(dead_code)] // FIXME: remove this `allow` when all member are used.
pub struct CartridgeHeader {
    pub rom_entry_point: [u8; 4],
    pub nintendo_logo: [u8; 156],
    pub game_title: String,
    pub game_code: String,
    pub marker_code: String,
    pub fixed_value: [u8; 1],
    pub main_unit_code: [u8; 1],
    pub device_type: [u8; 1],
    pub reserved_area_1: [u8; 7],
    pub software_version: [u8; 1],
    pub complement_check: u8,
    pub reserved_area_2: [u8; 2],
    pub ram_entry_point: [u8; 4],
    pub boot_mode: [u8; 1],
    pub slave_id_number: [u8; 1],
    pub not_used: [u8; 26],
    pub joybus_mode_entry_point: [u8; 4],
}

impl CartridgeHeader {
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(EmuError::InvalidCartridgeHeader(format!(
                "ROM is only {} bytes, need at least {HEADER_LEN} for a header",
                data.len()
            )));
        }

        let complement_check = Self::extract_complement_check(data)?;

        Ok(Self {
            rom_entry_point: Self::slice(data, 0x000, 0x003),
            nintendo_logo: Self::slice(data, 0x004, 0x09F),
            game_title: Self::extract_ascii(data, 0x0A0, 0x0AB, "game title")?,
            game_code: Self::extract_ascii(data, 0x0AC, 0x0AF, "game code")?,
            marker_code: Self::extract_ascii(data, 0x0B0, 0x0B1, "marker code")?,
            fixed_value: Self::slice(data, 0x0B2, 0x0B2),
            main_unit_code: Self::slice(data, 0x0B3, 0x0B3),
            device_type: Self::slice(data, 0x0B4, 0x0B4),
            reserved_area_1: Self::slice(data, 0x0B5, 0x0BB),
            software_version: Self::slice(data, 0x0BC, 0x0BC),
            complement_check,
            reserved_area_2: Self::slice(data, 0x0BE, 0x0BF),
            ram_entry_point: Self::slice(data, 0x0C0, 0x0C3),
            boot_mode: Self::slice(data, 0x0C4, 0x0C4),
            slave_id_number: Self::slice(data, 0x0C5, 0x0C5),
            not_used: Self::slice(data, 0x0C6, 0x0DF),
            joybus_mode_entry_point: Self::slice(data, 0x0E0, 0x0E3),
        })
    }

    /// Copies `data[start..=end]` into a fixed-size array.
    ///
    /// `data.len() >= HEADER_LEN` was already checked in `new`, and every
    /// call site here stays within `0..HEADER_LEN`, so this never panics.
    fn slice<const N: usize>(data: &[u8], start: usize, end: usize) -> [u8; N] {
        data[start..=end]
            .try_into()
            .unwrap_or_else(|_| panic!("header field [{start:#x}..={end:#x}] is not {N} bytes"))
    }

    fn extract_ascii(data: &[u8], start: usize, end: usize, field: &str) -> Result<String> {
        String::from_utf8(data[start..=end].to_vec())
            .map_err(|_| EmuError::InvalidCartridgeHeader(format!("{field} is not valid ASCII")))
    }

    /// Header checksum, required.
    fn extract_complement_check(data: &[u8]) -> Result<u8> {
        let checksum_expected = data[0xBD];
        let checksum = data[0xA0..0xBD]
            .iter()
            .fold(0u8, |acc, &item| acc.wrapping_sub(item))
            .wrapping_sub(0x19);

        if checksum != checksum_expected {
            return Err(EmuError::InvalidCartridgeHeader(format!(
                "header checksum mismatch: expected {checksum_expected:#x}, computed {checksum:#x}"
            )));
        }

        Ok(checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_header() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
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
    fn parses_a_well_formed_header() {
        let data = make_valid_header();
        let header = CartridgeHeader::new(&data).unwrap();
        assert_eq!(header.game_code, "ABCD");
    }

    #[test]
    fn rejects_a_truncated_rom() {
        let data = vec![0u8; 10];
        assert!(CartridgeHeader::new(&data).is_err());
    }

    #[test]
    fn rejects_a_bad_checksum() {
        let mut data = make_valid_header();
        data[0xBD] ^= 0xFF;
        assert!(CartridgeHeader::new(&data).is_err());
    }
}
