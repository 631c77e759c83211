//! Logical partition table for the external NOR device.
//!
//! Named regions of the 32 MB flash address space. The table is consumed by
//! the utility layer for named lookups only — the driver itself is
//! region-agnostic and enforces nothing here.
//!
//! # Layout (offsets relative to the device, add `0x9000_0000` for the
//! CPU address in XiP mode)
//!
//! ```text
//! Offset       Size    Contents
//! 0x0000_0000   2 MB   app  — application image, executed in place
//! 0x0020_0000   1 MB   cfg  — device configuration records
//! 0x0030_0000   1 MB   user — user preferences / pairing data
//! 0x0040_0000  24 MB   fs   — FatFs-backed media storage (USB MSC exposes it)
//! 0x01C0_0000   4 MB   log  — on-device data log ring
//! ```
//!
//! The internal-flash bootloader is **not** a table entry: it lives in a
//! different device entirely (see `platform::memory_map`), and the
//! descriptor-overlap invariant is asserted against that reservation in the
//! device tests.

/// One named region: `(name, start offset, size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Partition {
    /// Short lookup name.
    pub name: &'static str,
    /// Start offset within the device, bytes.
    pub offset: u32,
    /// Region size, bytes.
    pub size: u32,
}

impl Partition {
    /// Exclusive end offset.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // table entries sum to the device size
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }

    /// `true` when `offset` falls inside this partition.
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

const MIB: u32 = 1024 * 1024;

/// The compiled-in partition table. Entries are non-overlapping and
/// monotonically increasing in offset; the total equals the device size
/// exactly (asserted in tests).
pub const PARTITIONS: &[Partition] = &[
    Partition {
        name: "app",
        offset: 0x0000_0000,
        size: 2 * MIB,
    },
    Partition {
        name: "cfg",
        offset: 0x0020_0000,
        size: MIB,
    },
    Partition {
        name: "user",
        offset: 0x0030_0000,
        size: MIB,
    },
    Partition {
        name: "fs",
        offset: 0x0040_0000,
        size: 24 * MIB,
    },
    Partition {
        name: "log",
        offset: 0x01C0_0000,
        size: 4 * MIB,
    },
];

/// Look a partition up by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Partition> {
    PARTITIONS.iter().find(|p| p.name == name)
}

/// The partition containing `offset`, if any.
#[must_use]
pub fn containing(offset: u32) -> Option<&'static Partition> {
    PARTITIONS.iter().find(|p| p.contains(offset))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::device::W25Q256JV;

    /// Entries must be contiguous, monotonically increasing, and sum to the
    /// device capacity exactly.
    #[test]
    fn test_table_is_contiguous_and_exact() {
        let mut expected_offset = 0u32;
        for p in PARTITIONS {
            assert_eq!(
                p.offset, expected_offset,
                "partition '{}' must start where the previous one ends",
                p.name
            );
            expected_offset = p.end();
        }
        assert_eq!(expected_offset, W25Q256JV.size, "table must cover the device exactly");
    }

    /// Every partition boundary must be sector-aligned, or writes near the
    /// edges would merge bytes across partitions during erase-before-write.
    #[test]
    fn test_boundaries_sector_aligned() {
        for p in PARTITIONS {
            assert_eq!(p.offset % W25Q256JV.sector_size, 0, "'{}' start", p.name);
            assert_eq!(p.size % W25Q256JV.sector_size, 0, "'{}' size", p.name);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(find("app").unwrap().offset, 0);
        assert_eq!(find("fs").unwrap().size, 24 * MIB);
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_containing_offset() {
        assert_eq!(containing(0).unwrap().name, "app");
        assert_eq!(containing(0x0020_0000).unwrap().name, "cfg");
        assert_eq!(containing(0x01FF_FFFF).unwrap().name, "log");
        assert!(containing(0x0200_0000).is_none()); // one past the end
    }
}
