//! SDRAM code-relocation loader.
//!
//! The application image executes from memory-mapped QSPI flash, but its
//! hot `.text`/`.rodata` runs from SDRAM: this module copies those sections
//! from their link-time load addresses (flash) to their run addresses
//! (SDRAM) via DMA, then makes the destination visible to instruction
//! fetch. It must run before **any** SDRAM-resident code or data is
//! touched.
//!
//! # Ordering invariants (not reorderable)
//!
//! 1. Invalidate the destination D-cache range *before* any DMA write
//!    lands — a stale line would otherwise satisfy a later CPU read with
//!    pre-copy garbage.
//! 2. Copy each section in fixed-size chunks, every transfer length rounded
//!    up to the DMA burst alignment (32 bytes). Over-copy into the
//!    following bytes is fine: the destination region is loader-reserved.
//! 3. Invalidate the destination ranges *again* after the copies
//!    (speculative prefetch may have pulled lines in mid-copy), then
//!    DSB → global I-cache invalidate → ISB, so instruction fetch sees the
//!    new bytes and not stale cached instructions.
//!
//! # Failure policy
//!
//! Any chunk failure aborts the **entire** relocation and the caller halts
//! the boot. Continuing past a failed chunk would leave the section's
//! destination partially written and eventually execute undefined bytes —
//! there is no degraded mode here.

/// DMA copy chunk size. Bounds a single transfer's duration so the
/// per-chunk completion poll has a meaningful deadline.
pub const COPY_CHUNK: u32 = 16 * 1024;

/// DMA engine burst alignment. Every transfer length is a multiple of this.
pub const BURST_ALIGN: u32 = 32;

/// One relocatable section: link-time load address, SDRAM run address,
/// byte length. Computed once per boot from linker-provided symbols;
/// consumed once, not retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "hardware", derive(defmt::Format))]
pub struct SectionDesc {
    /// Section name, for diagnostics.
    pub name: &'static str,
    /// Load address in flash (source).
    pub load: u32,
    /// Run address in SDRAM (destination).
    pub run: u32,
    /// Section length in bytes (before burst rounding).
    pub len: u32,
}

impl SectionDesc {
    /// The length actually transferred and cache-maintained: `len` rounded
    /// up to [`BURST_ALIGN`].
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // len + 31 cannot overflow for linker sections
    pub fn dma_len(&self) -> u32 {
        (self.len + (BURST_ALIGN - 1)) & !(BURST_ALIGN - 1)
    }
}

/// DMA copy failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "hardware", derive(defmt::Format))]
pub enum CopyError {
    /// The transfer could not be started (channel fault).
    Start,
    /// The transfer did not complete within the per-chunk deadline.
    Timeout,
}

/// Relocation failures. Terminal for the whole boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "hardware", derive(defmt::Format))]
pub enum RelocateError {
    /// A chunk transfer failed; the named section's destination contents
    /// are undefined and the boot must not continue.
    Copy {
        /// Section whose copy failed.
        section: &'static str,
        /// Byte offset of the failed chunk within the section.
        offset: u32,
        /// What went wrong with the transfer.
        kind: CopyError,
    },
}

/// Blocking DMA copy engine: starts a transfer and polls completion against
/// a fixed per-chunk timeout. No callback-based completion in this path.
pub trait DmaCopier {
    /// Copy `len` bytes from `src` to `dst`. `len` is a non-zero multiple
    /// of [`BURST_ALIGN`].
    fn copy(&mut self, src: u32, dst: u32, len: u32) -> Result<(), CopyError>;
}

/// Cache maintenance primitives, split so tests can assert their order.
pub trait CacheOps {
    /// Invalidate the D-cache over `[addr, addr + len)`.
    fn invalidate_dcache_range(&mut self, addr: u32, len: u32);
    /// Invalidate the entire I-cache.
    fn invalidate_icache(&mut self);
    /// Data synchronization barrier.
    fn dsb(&mut self);
    /// Instruction synchronization barrier.
    fn isb(&mut self);
}

/// Copy every section to its run address and publish the result to
/// instruction fetch. See the module docs for the ordering invariants.
pub fn relocate_sections(
    copier: &mut impl DmaCopier,
    cache: &mut impl CacheOps,
    sections: &[SectionDesc],
) -> Result<(), RelocateError> {
    // Pre-copy: no stale destination lines may absorb or shadow DMA writes.
    for section in sections {
        cache.invalidate_dcache_range(section.run, section.dma_len());
    }

    #[allow(clippy::arithmetic_side_effects)] // offset < dma_len, chunk ≤ COPY_CHUNK
    for section in sections {
        let total = section.dma_len();
        let mut offset: u32 = 0;
        while offset < total {
            let chunk = COPY_CHUNK.min(total - offset);
            copier
                .copy(section.load + offset, section.run + offset, chunk)
                .map_err(|kind| RelocateError::Copy {
                    section: section.name,
                    offset,
                    kind,
                })?;
            offset += chunk;
        }
    }

    // Post-copy: drop anything speculatively prefetched during the copies,
    // then make instruction fetch re-read the relocated ranges.
    for section in sections {
        cache.invalidate_dcache_range(section.run, section.dma_len());
    }
    cache.dsb();
    cache.invalidate_icache();
    cache.isb();
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    /// Records every copy and cache call in arrival order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Copy { src: u32, dst: u32, len: u32 },
        InvD { addr: u32, len: u32 },
        InvI,
        Dsb,
        Isb,
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
        fail_copy_at: Option<u32>,
    }

    impl DmaCopier for Recorder {
        fn copy(&mut self, src: u32, dst: u32, len: u32) -> Result<(), CopyError> {
            if self.fail_copy_at == Some(dst) {
                return Err(CopyError::Timeout);
            }
            self.ops.push(Op::Copy { src, dst, len });
            Ok(())
        }
    }

    struct CacheRecorder<'a>(&'a mut Vec<Op>);

    impl CacheOps for CacheRecorder<'_> {
        fn invalidate_dcache_range(&mut self, addr: u32, len: u32) {
            self.0.push(Op::InvD { addr, len });
        }
        fn invalidate_icache(&mut self) {
            self.0.push(Op::InvI);
        }
        fn dsb(&mut self) {
            self.0.push(Op::Dsb);
        }
        fn isb(&mut self) {
            self.0.push(Op::Isb);
        }
    }

    const TEXT: SectionDesc = SectionDesc {
        name: "sdram_text",
        load: 0x9010_0000,
        run: 0xC000_0000,
        len: 100_000,
    };

    /// A 100 000-byte section copies in ceil(100000/16384) = 7 transfers,
    /// each a multiple of 32 bytes.
    #[test]
    fn test_chunk_count_and_burst_alignment() {
        let mut cache_ops = Vec::new();
        let mut copier = Recorder::default();
        relocate_sections(&mut copier, &mut CacheRecorder(&mut cache_ops), &[TEXT]).unwrap();

        let copies: Vec<&Op> = copier
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Copy { .. }))
            .collect();
        assert_eq!(copies.len(), 7, "ceil(100000 / 16384) transfers");
        let mut copied = 0u32;
        for op in &copies {
            if let Op::Copy { len, .. } = op {
                assert_eq!(len % BURST_ALIGN, 0, "every transfer is burst-aligned");
                copied += len;
            }
        }
        assert_eq!(copied, TEXT.dma_len());
        assert_eq!(TEXT.dma_len(), 100_000, "100000 is already 32-aligned");
    }

    /// dma_len rounds an unaligned length up to the next burst boundary.
    #[test]
    fn test_dma_len_rounds_up() {
        let s = SectionDesc {
            name: "rodata",
            load: 0,
            run: 0,
            len: 100,
        };
        assert_eq!(s.dma_len(), 128);
        let aligned = SectionDesc { len: 96, ..s };
        assert_eq!(aligned.dma_len(), 96);
    }

    /// The full ordering contract: pre-invalidate → copies → post-invalidate
    /// → DSB → I-cache invalidate → ISB.
    #[test]
    fn test_cache_operation_ordering() {
        let rodata = SectionDesc {
            name: "sdram_rodata",
            load: 0x9012_0000,
            run: 0xC010_0000,
            len: 4096,
        };
        let mut cache_ops = Vec::new();
        let mut copier = Recorder::default();
        relocate_sections(
            &mut copier,
            &mut CacheRecorder(&mut cache_ops),
            &[TEXT, rodata],
        )
        .unwrap();

        // Two pre-copy invalidates (one per section), two post-copy, then
        // the barrier/invalidate tail in exact order.
        assert_eq!(
            cache_ops,
            vec![
                Op::InvD { addr: TEXT.run, len: TEXT.dma_len() },
                Op::InvD { addr: rodata.run, len: rodata.dma_len() },
                Op::InvD { addr: TEXT.run, len: TEXT.dma_len() },
                Op::InvD { addr: rodata.run, len: rodata.dma_len() },
                Op::Dsb,
                Op::InvI,
                Op::Isb,
            ]
        );
    }

    /// A failed chunk aborts the whole relocation: no further copies, no
    /// cache publication, and the error names the section and offset.
    #[test]
    fn test_chunk_failure_aborts_everything() {
        let rodata = SectionDesc {
            name: "sdram_rodata",
            load: 0x9012_0000,
            run: 0xC010_0000,
            len: 4096,
        };
        let mut cache_ops = Vec::new();
        let mut copier = Recorder {
            fail_copy_at: Some(TEXT.run + 2 * COPY_CHUNK), // third chunk
            ..Default::default()
        };
        let err = relocate_sections(
            &mut copier,
            &mut CacheRecorder(&mut cache_ops),
            &[TEXT, rodata],
        )
        .unwrap_err();

        assert_eq!(
            err,
            RelocateError::Copy {
                section: "sdram_text",
                offset: 2 * COPY_CHUNK,
                kind: CopyError::Timeout,
            }
        );
        let copies = copier
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Copy { .. }))
            .count();
        assert_eq!(copies, 2, "no copy after the failed chunk");
        assert!(
            !cache_ops.contains(&Op::InvI),
            "the I-cache must never be published for a partial copy"
        );
    }

    /// Sections shorter than one chunk copy in a single transfer.
    #[test]
    fn test_small_section_single_transfer() {
        let small = SectionDesc {
            name: "tiny",
            load: 0x9000_8000,
            run: 0xC020_0000,
            len: 40,
        };
        let mut cache_ops = Vec::new();
        let mut copier = Recorder::default();
        relocate_sections(&mut copier, &mut CacheRecorder(&mut cache_ops), &[small]).unwrap();
        assert_eq!(
            copier.ops,
            vec![Op::Copy { src: small.load, dst: small.run, len: 64 }]
        );
    }
}
