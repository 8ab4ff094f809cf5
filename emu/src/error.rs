//! Error types surfaced across construction and ROM/BIOS loading.
//!
//! Everything reachable once a frame is running is infallible by design (see
//! the bus and CPU docs): unmapped reads return open bus, unmapped writes are
//! dropped, unimplemented opcodes log and no-op. These variants only cover the
//! fallible setup path described for the host (`load_bios`/`load_rom`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmuError {
    #[error("BIOS image must be exactly 16 KiB, got {0} bytes")]
    InvalidBiosSize(usize),

    #[error("ROM is too large to allocate ({0} bytes, max 32 MiB)")]
    RomTooLarge(usize),

    #[error("cartridge header is malformed: {0}")]
    InvalidCartridgeHeader(String),
}

pub type Result<T> = std::result::Result<T, EmuError>;
