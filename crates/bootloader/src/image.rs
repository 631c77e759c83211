//! Application image header validation.
//!
//! The application image carries a standard ARM vector table at its base:
//! word 0 is the initial stack pointer, word 1 the reset vector. The
//! bootloader re-validates both words on **every** boot, before the vector
//! table is relocated — a jump through garbage is unrecoverable by
//! construction, so the checks sit on the last safe side of the handoff.

use platform::memory_map;

/// The two words at the base of a candidate application image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppImageHeader {
    /// Word 0 — initial main stack pointer.
    pub stack_pointer: u32,
    /// Word 1 — reset handler address.
    pub reset_vector: u32,
}

impl AppImageHeader {
    /// Parse from the first 8 bytes of the image (little-endian words).
    #[must_use]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        let [s0, s1, s2, s3, r0, r1, r2, r3] = bytes;
        Self {
            stack_pointer: u32::from_le_bytes([s0, s1, s2, s3]),
            reset_vector: u32::from_le_bytes([r0, r1, r2, r3]),
        }
    }
}

/// Acceptance ranges for the two header words. Both bounds are INCLUSIVE.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// Lowest acceptable initial stack pointer.
    pub stack_min: u32,
    /// Highest acceptable initial stack pointer.
    pub stack_max: u32,
    /// Lowest acceptable reset-vector address.
    pub vector_min: u32,
    /// Highest acceptable reset-vector address.
    pub vector_max: u32,
}

impl BootConfig {
    /// Ranges for the H750 board: stack anywhere in DTCM..top of AXI SRAM,
    /// reset vector anywhere in the 32 MB XiP window.
    pub const H750: Self = Self {
        stack_min: memory_map::APP_VALID_STACK_MIN,
        stack_max: memory_map::APP_VALID_STACK_MAX,
        vector_min: memory_map::APP_VALID_VECTOR_MIN,
        vector_max: memory_map::APP_VALID_VECTOR_MAX,
    };
}

/// Validation failures — terminal: the bootloader halts rather than attempt
/// a partial boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidateError {
    /// The stack-pointer word is outside the configured RAM range.
    StackOutOfRange {
        /// The offending value.
        stack_pointer: u32,
    },
    /// The reset-vector word is outside the configured flash range.
    VectorOutOfRange {
        /// The offending value.
        reset_vector: u32,
    },
}

/// A header that passed validation, ready for the jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ValidatedImage {
    /// Validated initial stack pointer.
    pub stack_pointer: u32,
    /// Validated reset-vector address.
    pub reset_vector: u32,
    /// The vector's low bit was clear (an even, non-Thumb address).
    /// Warning-class: boot proceeds, the diagnostic is logged.
    pub thumb_bit_clear: bool,
}

/// Check both header words against `cfg`. Range bounds are inclusive on
/// both ends; an even reset vector is a warning flag on the result, not an
/// error.
pub fn validate(header: AppImageHeader, cfg: &BootConfig) -> Result<ValidatedImage, ValidateError> {
    if header.stack_pointer < cfg.stack_min || header.stack_pointer > cfg.stack_max {
        return Err(ValidateError::StackOutOfRange {
            stack_pointer: header.stack_pointer,
        });
    }
    if header.reset_vector < cfg.vector_min || header.reset_vector > cfg.vector_max {
        return Err(ValidateError::VectorOutOfRange {
            reset_vector: header.reset_vector,
        });
    }
    Ok(ValidatedImage {
        stack_pointer: header.stack_pointer,
        reset_vector: header.reset_vector,
        thumb_bit_clear: header.reset_vector & 1 == 0,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const OK_VECTOR: u32 = 0x9000_0401;

    fn header(sp: u32, rv: u32) -> AppImageHeader {
        AppImageHeader {
            stack_pointer: sp,
            reset_vector: rv,
        }
    }

    /// Both stack bounds are inclusive: exactly-at passes, one byte out fails.
    #[test]
    fn test_stack_bounds_inclusive() {
        let cfg = BootConfig::H750;

        assert!(validate(header(cfg.stack_min, OK_VECTOR), &cfg).is_ok());
        assert_eq!(
            validate(header(cfg.stack_min - 1, OK_VECTOR), &cfg),
            Err(ValidateError::StackOutOfRange {
                stack_pointer: cfg.stack_min - 1
            })
        );
        assert!(validate(header(cfg.stack_max, OK_VECTOR), &cfg).is_ok());
        assert_eq!(
            validate(header(cfg.stack_max + 1, OK_VECTOR), &cfg),
            Err(ValidateError::StackOutOfRange {
                stack_pointer: cfg.stack_max + 1
            })
        );
    }

    /// Both vector bounds are inclusive.
    #[test]
    fn test_vector_bounds_inclusive() {
        let cfg = BootConfig::H750;
        let sp = 0x2400_0000;

        assert!(validate(header(sp, cfg.vector_min | 1), &cfg).is_ok());
        assert_eq!(
            validate(header(sp, cfg.vector_min - 1), &cfg),
            Err(ValidateError::VectorOutOfRange {
                reset_vector: cfg.vector_min - 1
            })
        );
        assert!(validate(header(sp, cfg.vector_max), &cfg).is_ok());
        assert_eq!(
            validate(header(sp, cfg.vector_max + 1), &cfg),
            Err(ValidateError::VectorOutOfRange {
                reset_vector: cfg.vector_max + 1
            })
        );
    }

    /// An even reset vector passes validation but raises the warning flag;
    /// an odd (Thumb) vector does not.
    #[test]
    fn test_even_vector_warns_but_passes() {
        let cfg = BootConfig::H750;
        let even = validate(header(0x2400_0000, 0x9000_0400), &cfg).unwrap();
        assert!(even.thumb_bit_clear, "even vector must raise the warning");

        let odd = validate(header(0x2400_0000, 0x9000_0401), &cfg).unwrap();
        assert!(!odd.thumb_bit_clear);
    }

    #[test]
    fn test_header_from_bytes_little_endian() {
        let h = AppImageHeader::from_bytes([0x00, 0x00, 0x02, 0x24, 0x01, 0x04, 0x00, 0x90]);
        assert_eq!(h.stack_pointer, 0x2402_0000);
        assert_eq!(h.reset_vector, 0x9000_0401);
    }
}
