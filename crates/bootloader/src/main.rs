//! Ember H750 stage-1 bootloader — hardware entry point.
//!
//! Runs from the 128 KB internal flash. Brings up the MPU/caches and the
//! QUADSPI NOR, maps the flash for execute-in-place, validates the
//! application image header, and either jumps or halts with diagnostics on
//! RTT. No watchdog is armed here: a halted bootloader must stay halted for
//! field diagnosis, not reset-loop.

#![no_std]
#![no_main]

use bootloader::handoff::{boot_to_decision, BootDecision, BootFault, BootStage};
use bootloader::image::{AppImageHeader, BootConfig};
use bootloader::hardware;
use embassy_stm32::qspi::enums::{
    AddressSize, ChipSelectHighTime, FIFOThresholdLevel, MemorySize,
};
use embassy_stm32::qspi::{Config as QspiConfig, Qspi};
use extflash::hw::HwTransport;
use extflash::{NorDriver, W25Q256JV};
use platform::memory_map::QSPI_MAPPED_BASE;
use platform::qspi_config::QSPI_PRESCALER;

use defmt_rtt as _;
use panic_probe as _;

/// Explicit, minimal clock tree: 64 MHz HSI everywhere. The bootloader
/// optimizes for determinism over speed — the application image owns the
/// real clock configuration after the jump, and an XiP fetch path at
/// HSI/(prescaler+1) is still orders of magnitude above what the jump
/// sequence needs.
fn rcc_config() -> embassy_stm32::Config {
    let mut config = embassy_stm32::Config::default();
    config.rcc.hsi = Some(embassy_stm32::rcc::HSIPrescaler::DIV1);
    config
}

/// Volatile reads of the two header words from the mapped window. Only
/// valid once the transport is in memory-mapped mode.
fn fetch_mapped_header() -> AppImageHeader {
    // SAFETY: called after memory_mapped_mode() succeeded, so the window at
    // QSPI_MAPPED_BASE is a readable flash mapping.
    let stack_pointer = unsafe { core::ptr::read_volatile(QSPI_MAPPED_BASE as *const u32) };
    // SAFETY: same mapping, +4 is still inside the 32 MB window.
    let reset_vector =
        unsafe { core::ptr::read_volatile((QSPI_MAPPED_BASE + 4) as *const u32) };
    AppImageHeader {
        stack_pointer,
        reset_vector,
    }
}

#[cortex_m_rt::entry]
fn main() -> ! {
    // Step 0: MPU + caches BEFORE any QSPI traffic or D-cache-over-DMA
    // hazard. See platform::mpu::MpuApplier::boot_register_pairs.
    // SAFETY: first statement at boot; interrupts masked by reset state.
    unsafe { hardware::apply_boot_mpu_and_caches() };

    let p = embassy_stm32::init(rcc_config());

    defmt::info!("Ember bootloader — STM32H750, W25Q256JV @ QUADSPI bank 1");

    let mut qspi_config = QspiConfig::default();
    qspi_config.memory_size = MemorySize::_32MiB;
    qspi_config.address_size = AddressSize::_32bit;
    qspi_config.prescaler = QSPI_PRESCALER;
    qspi_config.cs_high_time = ChipSelectHighTime::_5Cycle;
    qspi_config.fifo_threshold = FIFOThresholdLevel::_16Bytes;
    let qspi = Qspi::new_blocking_bank1(
        p.QUADSPI, p.PD11, // IO0
        p.PD12, // IO1
        p.PE2,  // IO2
        p.PD13, // IO3
        p.PB2,  // CLK
        p.PB6,  // NCS
        qspi_config,
    );
    let mut driver = NorDriver::new(HwTransport::new(qspi), W25Q256JV);

    let decision = boot_to_decision(
        &mut driver,
        &BootConfig::H750,
        fetch_mapped_header,
        |stage| match stage {
            BootStage::Init => defmt::info!("boot: init"),
            BootStage::FlashBringup => defmt::info!("boot: NOR bring-up + ID check"),
            BootStage::MemoryMapped => defmt::info!("boot: entering memory-mapped mode"),
            BootStage::Validate => defmt::info!("boot: validating image header"),
        },
    );

    match decision {
        BootDecision::Jump(image) => {
            if image.thumb_bit_clear {
                defmt::warn!(
                    "reset vector 0x{=u32:08X} has a clear Thumb bit — proceeding",
                    image.reset_vector
                );
            }
            defmt::info!(
                "jump: sp=0x{=u32:08X} pc=0x{=u32:08X}",
                image.stack_pointer,
                image.reset_vector
            );
            // SAFETY: image validated against BootConfig::H750; flash left
            // memory-mapped by the state machine.
            unsafe { hardware::jump(&image) }
        }
        BootDecision::Halt(fault) => {
            match fault {
                BootFault::FlashBringup(e) => {
                    defmt::error!("halt: NOR bring-up failed: {}", e);
                }
                BootFault::MemoryMapped(e) => {
                    defmt::error!("halt: memory-mapped entry failed: {}", e);
                }
                BootFault::Validate(e) => {
                    defmt::error!("halt: image rejected: {}", e);
                }
            }
            hardware::halt()
        }
    }
}
