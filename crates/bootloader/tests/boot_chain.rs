//! End-to-end boot-chain scenario against the simulated flash:
//! program an application image the way the host tool would (init, erase,
//! write, read-back), then run the bootloader state machine over the same
//! device and check the decision.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use bootloader::handoff::{boot_to_decision, BootDecision, BootFault};
use bootloader::image::{AppImageHeader, BootConfig, ValidateError};
use extflash::sim::{SimFlash, SIM_DEVICE, SIM_SIZE};
use extflash::NorDriver;

/// A minimal application image: vector table (SP, reset vector) plus some
/// code-shaped filler.
fn make_image(sp: u32, reset: u32) -> Vec<u8> {
    let mut image = vec![0u8; 1024];
    image[..4].copy_from_slice(&sp.to_le_bytes());
    image[4..8].copy_from_slice(&reset.to_le_bytes());
    for (i, b) in image[8..].iter_mut().enumerate() {
        *b = (i % 253) as u8;
    }
    image
}

/// Reproduce the host-tool programming sequence (Init → SectorErase →
/// Write → read-back) and hand back the programmed device.
fn program_image(image: &[u8]) -> SimFlash<SIM_SIZE> {
    let mut driver = NorDriver::new(SimFlash::new(), SIM_DEVICE);
    assert!(driver.init().is_ok(), "Init phase must succeed");

    let end = image.len() as u32;
    let mut sector = 0u32;
    while sector < end {
        driver.erase_sector(sector).unwrap();
        sector += SIM_DEVICE.sector_size;
    }

    driver.write_buffer(0, image).unwrap();
    let mut readback = vec![0u8; image.len()];
    driver.read_buffer(0, &mut readback).unwrap();
    assert_eq!(readback, image, "Verify phase must match");

    driver.release()
}

/// Read the header the way the hardware does through the mapped window:
/// the first 8 bytes of the device.
fn header_from(sim: &SimFlash<SIM_SIZE>) -> AppImageHeader {
    let mut words = [0u8; 8];
    words.copy_from_slice(&sim.mem()[..8]);
    AppImageHeader::from_bytes(words)
}

#[test]
fn programmed_image_boots_to_jump() {
    let sim = program_image(&make_image(0x2402_0000, 0x9000_0411));
    let header = header_from(&sim);
    let mut driver = NorDriver::new(sim, SIM_DEVICE);

    let decision = boot_to_decision(&mut driver, &BootConfig::H750, || header, |_| {});
    match decision {
        BootDecision::Jump(img) => {
            assert_eq!(img.stack_pointer, 0x2402_0000);
            assert_eq!(img.reset_vector, 0x9000_0411);
            assert!(!img.thumb_bit_clear);
        }
        BootDecision::Halt(f) => panic!("expected Jump, got {f:?}"),
    }
    assert!(driver.is_memory_mapped(), "flash must stay mapped for the jump");
}

#[test]
fn image_with_bad_vector_halts() {
    // Reset vector points below the mapped window (internal flash address).
    let sim = program_image(&make_image(0x2402_0000, 0x0800_1001));
    let header = header_from(&sim);
    let mut driver = NorDriver::new(sim, SIM_DEVICE);

    let decision = boot_to_decision(&mut driver, &BootConfig::H750, || header, |_| {});
    assert_eq!(
        decision,
        BootDecision::Halt(BootFault::Validate(ValidateError::VectorOutOfRange {
            reset_vector: 0x0800_1001
        }))
    );
}

#[test]
fn erased_device_halts_without_jumping() {
    // Never programmed: the header words read as 0xFFFF_FFFF, which fails
    // the stack-pointer range check before the vector is even considered.
    let sim = SimFlash::<SIM_SIZE>::new();
    let header = header_from(&sim);
    let mut driver = NorDriver::new(sim, SIM_DEVICE);

    let decision = boot_to_decision(&mut driver, &BootConfig::H750, || header, |_| {});
    assert_eq!(
        decision,
        BootDecision::Halt(BootFault::Validate(ValidateError::StackOutOfRange {
            stack_pointer: 0xFFFF_FFFF
        }))
    );
}
