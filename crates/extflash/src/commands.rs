//! W25Q256JV instruction set and status-register bits.
//!
//! Only the subset the boot chain uses. Opcodes from the W25Q256JV datasheet
//! (Winbond, rev. K, §8.1.2 instruction set table). After Enter 4-Byte
//! Address Mode (0xB7) all address-bearing instructions below accept 32-bit
//! addresses, which is how the driver reaches the upper 16 MB of the part.

/// Write Enable — sets the write-enable latch (WEL).
pub const WRITE_ENABLE: u8 = 0x06;

/// Read Status Register-1 (BUSY and WEL live here).
pub const READ_STATUS_1: u8 = 0x05;

/// Quad Input Page Program — address on 1 line, data on 4 lines, ≤ 256 B.
pub const PAGE_PROGRAM_QUAD: u8 = 0x32;

/// Fast Read Quad I/O — address and data on 4 lines.
pub const FAST_READ_QUAD_IO: u8 = 0xEB;

/// Sector Erase — 4 KiB.
pub const SECTOR_ERASE_4KB: u8 = 0x20;

/// Block Erase — 64 KiB.
pub const BLOCK_ERASE_64KB: u8 = 0xD8;

/// Chip Erase — whole device (~100 s class on the 32 MB part).
pub const CHIP_ERASE: u8 = 0xC7;

/// Enable Reset — must immediately precede [`RESET_DEVICE`].
pub const ENABLE_RESET: u8 = 0x66;

/// Reset Device — returns the part to power-up state (3-byte address mode).
pub const RESET_DEVICE: u8 = 0x99;

/// JEDEC ID — returns manufacturer + device type + capacity (3 bytes).
pub const JEDEC_ID: u8 = 0x9F;

/// Enter 4-Byte Address Mode — required to address past 16 MB.
pub const ENTER_4BYTE_ADDRESS_MODE: u8 = 0xB7;

// ── Status Register-1 bits ───────────────────────────────────────────────────

/// BUSY — set while a program, erase, or reset is in progress.
pub const STATUS_BUSY: u8 = 0x01;

/// WEL — write-enable latch; hardware clears it when the program/erase
/// completes, which is why the driver re-asserts it before every operation.
pub const STATUS_WEL: u8 = 0x02;
