//! QUADSPI configuration for W25Q256JV NOR flash.
//!
//! The QUADSPI controller is used in two modes by the boot chain:
//!
//! - **Indirect mode** — the bootloader and the external-loader plugin issue
//!   explicit command/address/data transactions (program, erase, ID read).
//! - **Memory-mapped (XiP) mode** — the controller presents the flash as a
//!   read-only window at `0x9000_0000`; the CPU fetches instructions and
//!   data directly from it. Entering this mode is one-way for the transport:
//!   indirect transactions require an abort + reconfigure afterwards.
//!
//! # Hardware
//!
//! **Flash chip:** W25Q256JV (Winbond) — 32 MB, 133 MHz max, JEDEC ID
//! `0xEF4019`. Because the part is larger than 16 MB, 24-bit addresses
//! cannot reach the upper half; the driver enters 4-byte address mode
//! (command 0xB7) at reset and every transaction carries a 32-bit address.
//!
//! **Fast Read Quad I/O command (0xEB):**
//! - 8-bit instruction phase (single wire)
//! - 32-bit address phase (quad wires, 4-byte mode)
//! - 6 dummy cycles (2 mode clocks + 4 waits, quad wires)
//! - N-byte data phase (quad wires)
//!
//! In XiP mode the controller generates the 0xEB command automatically for
//! every cache-line fetch from the `0x9000_0000` window.
//!
//! # Embassy / PAC note
//!
//! Embassy-stm32 issue \#3149: `embassy_stm32::qspi` does **not** implement
//! memory-mapped mode. XiP must be enabled via PAC-level register writes:
//!
//! ```text
//! QUADSPI.CCR: FMODE = 0b11 (memory-mapped)
//!              IMODE = 0b01 (1-wire instruction)
//!              ADMODE = 0b11 (4-wire address)
//!              ADSIZE = 0b11 (32-bit address)
//!              DMODE = 0b11 (4-wire data)
//!              DCYC = 6     (dummy cycles)
//!              INSTRUCTION = 0xEB
//! ```
//!
//! # Sources
//!
//! - W25Q256JV datasheet (Winbond, rev. K): §8.2 instruction set,
//!   §8.2.14 Fast Read Quad I/O, §8.2.26 Enter 4-Byte Address Mode
//! - STM32H750 Reference Manual RM0433: §24.3 QUADSPI functional description

/// QUADSPI clock prescaler for the target read frequency.
///
/// `QUADSPI_CLK = kernel_clk / (QSPI_PRESCALER + 1)`
///
/// The QUADSPI kernel clock is PLL2R = 200 MHz; `prescaler = 1` → 100 MHz,
/// comfortably inside the W25Q256JV 133 MHz ceiling.
pub const QSPI_PRESCALER: u8 = 1;

/// Flash size field for `QUADSPI_DCR.FSIZE`.
///
/// Hardware formula: addressable bytes = 2^(`FSIZE` + 1).
/// W25Q256JV = 32 MB = 2^25 → `FSIZE = 24`.
pub const QSPI_FLASH_SIZE_FIELD: u8 = 24;

/// Number of dummy cycles for Fast Read Quad I/O (command 0xEB).
///
/// W25Q256JV datasheet: 2 mode clocks + 4 wait cycles in quad mode.
/// The mode bits are driven as don't-care (no continuous-read latching),
/// so the controller treats all 6 as dummy cycles.
pub const QSPI_DUMMY_CYCLES: u8 = 6;

/// Fast Read Quad I/O command byte.
pub const QSPI_READ_CMD: u8 = 0xEB;

/// W25Q256JV maximum operating frequency (Hz), from the datasheet AC table.
pub const QSPI_MAX_FREQ_HZ: u32 = 133_000_000;

/// Validate that a QUADSPI prescaler value produces a clock within device limits.
///
/// # Arguments
///
/// * `kernel_hz` — QUADSPI kernel clock in Hz (PLL2R, e.g. `200_000_000`).
/// * `prescaler` — The `QUADSPI_CR.PRESCALER` value (0–255); QSPI clock =
///   `kernel_hz / (prescaler + 1)`.
///
/// # Returns
///
/// `Ok(qspi_hz)` — actual QSPI clock in Hz, if within spec.
/// `Err(&'static str)` — human-readable error if the clock exceeds the limit.
pub fn validate_qspi_prescaler(kernel_hz: u32, prescaler: u8) -> Result<u32, &'static str> {
    let qspi_hz = kernel_hz / (u32::from(prescaler) + 1);
    if qspi_hz > QSPI_MAX_FREQ_HZ {
        return Err("QSPI clock exceeds W25Q256JV maximum of 133 MHz");
    }
    Ok(qspi_hz)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
