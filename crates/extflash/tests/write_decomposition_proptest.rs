//! Property tests for the buffered-write page decomposition.
//!
//! The device wraps any program that crosses a page boundary, silently
//! corrupting data, so `write_buffer` must decompose every (address, length)
//! combination into page-bounded chunks whose concatenation, in address
//! order, equals the input. The simulator models the wrap, so a bad
//! decomposition fails the round-trip comparison too.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use extflash::sim::{SimFlash, SimOp, SIM_DEVICE, SIM_SIZE};
use extflash::NorDriver;
use proptest::prelude::*;

fn fresh_driver() -> NorDriver<SimFlash<SIM_SIZE>> {
    let mut d = NorDriver::new(SimFlash::new(), SIM_DEVICE);
    d.init().unwrap();
    d
}

proptest! {
    /// For all unaligned (addr, size) pairs: no program crosses a page
    /// boundary, each program is preceded by its own write-enable, and the
    /// programmed bytes concatenate, in address order, to the input.
    #[test]
    fn prop_write_buffer_never_crosses_pages(
        addr in 0u32..(SIM_SIZE as u32 - 2048),
        len in 1usize..1024,
        seed in any::<u8>(),
    ) {
        let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect();
        let mut d = fresh_driver();
        d.write_buffer(addr, &data).unwrap();

        // 1. Page-boundary invariant on every issued program.
        let journal = d.transport_mut().journal().to_vec();
        let mut programmed: Vec<(u32, u32)> = Vec::new();
        for (i, op) in journal.iter().enumerate() {
            if let SimOp::Program { addr: a, len: l } = *op {
                prop_assert!((a % 256) + l <= 256, "program {a:#x}+{l} crosses a page");
                prop_assert!(matches!(journal[i - 1], SimOp::WriteEnable));
                programmed.push((a, l));
            }
        }

        // 2. Chunks are contiguous and in address order.
        let mut expect = addr;
        for &(a, l) in &programmed {
            prop_assert_eq!(a, expect, "chunks must be issued in address order");
            expect += l;
        }
        prop_assert_eq!(expect, addr + len as u32);

        // 3. The array content round-trips.
        let mem = d.transport_mut().mem().to_vec();
        prop_assert_eq!(&mem[addr as usize..addr as usize + len], &data[..]);
    }

    /// A page-aligned write of a whole number of pages issues exactly
    /// size/256 programs.
    #[test]
    fn prop_aligned_write_chunk_count(pages in 1u32..6) {
        let len = (pages * 256) as usize;
        let data = vec![0x5Au8; len];
        let mut d = fresh_driver();
        d.write_buffer(0x4000, &data).unwrap();
        let programs = d
            .transport_mut()
            .journal()
            .iter()
            .filter(|op| matches!(op, SimOp::Program { .. }))
            .count();
        prop_assert_eq!(programs as u32, pages);
    }
}
