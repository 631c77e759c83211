//! Ember H750 application image — hardware entry point.
//!
//! The bootloader arrives here with the MPU programmed, caches on, VTOR at
//! `0x9000_0000`, and the flash memory-mapped. Early boot finishes the job:
//! SDRAM bring-up, then the relocation copy, and only then the watchdog and
//! the task loop. See `firmware::boot::APP_BOOT_STEPS` for the pinned order.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use platform::sdram::{SdramInitSequence, SdramTiming};

use firmware::cache::ScbCacheOps;
use firmware::dma_copy::MdmaCopier;
use firmware::relocate::{relocate_sections, SectionDesc};
use firmware::{boot, sdram_init};

use defmt_rtt as _;
use panic_probe as _;

/// Section descriptors from the linker-provided symbols in `memory.x`.
/// Computed once per boot; consumed by the relocation pass and dropped.
fn sdram_sections() -> [SectionDesc; 2] {
    extern "C" {
        static __ssdram_text: u8;
        static __esdram_text: u8;
        static __sisdram_text: u8;
        static __ssdram_rodata: u8;
        static __esdram_rodata: u8;
        static __sisdram_rodata: u8;
    }
    // SAFETY: address-of only — linker symbols are never dereferenced.
    unsafe {
        let text_run = core::ptr::addr_of!(__ssdram_text) as u32;
        let text_end = core::ptr::addr_of!(__esdram_text) as u32;
        let rodata_run = core::ptr::addr_of!(__ssdram_rodata) as u32;
        let rodata_end = core::ptr::addr_of!(__esdram_rodata) as u32;
        [
            SectionDesc {
                name: "sdram_text",
                load: core::ptr::addr_of!(__sisdram_text) as u32,
                run: text_run,
                len: text_end.saturating_sub(text_run),
            },
            SectionDesc {
                name: "sdram_rodata",
                load: core::ptr::addr_of!(__sisdram_rodata) as u32,
                run: rodata_run,
                len: rodata_end.saturating_sub(rodata_run),
            },
        ]
    }
}

/// Terminal failure loop for early-boot faults. The watchdog is not armed
/// yet, so this parks the image where RTT diagnostics stay readable.
async fn halt_early_boot() {
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // Step 1: RCC — PLL1 sysclk, PLL2R for FMC + QUADSPI kernels.
    let p = embassy_stm32::init(boot::build_embassy_config());

    defmt::info!("Ember H750 application v{=str}", env!("CARGO_PKG_VERSION"));
    defmt::info!("running XiP from 0x9000_0000; relocating hot sections to SDRAM");

    // Step 2: SDRAM — JEDEC init sequence. Failure aborts the whole boot:
    // the relocation destination does not exist yet.
    let timing = SdramTiming::w9825g6kh6_at_100mhz();
    let sequence = SdramInitSequence::w9825g6kh6();
    if let Err(e) = sdram_init::init_sdram(&timing, &sequence) {
        defmt::error!("SDRAM init failed: {} — halting before relocation", e);
        halt_early_boot().await;
    }

    // Step 3: relocation — must complete before any .sdram_text/.sdram_rodata
    // symbol is touched. A chunk failure aborts the boot (partial code in
    // SDRAM must never become reachable).
    let sections = sdram_sections();
    for s in &sections {
        defmt::info!(
            "relocate {=str}: load=0x{=u32:08X} run=0x{=u32:08X} len={=u32}",
            s.name,
            s.load,
            s.run,
            s.len
        );
    }
    let mut copier = MdmaCopier::new();
    // SAFETY: early boot, pre-executor-spawn; nothing else holds the core
    // peripherals.
    let mut cache = unsafe { ScbCacheOps::new() };
    match relocate_sections(&mut copier, &mut cache, &sections) {
        Ok(()) => defmt::info!("relocation complete; SDRAM code is live"),
        Err(e) => {
            defmt::error!("relocation failed: {} — halting", e);
            halt_early_boot().await;
        }
    }

    // Step 4: watchdog — armed only now that the image is fully resident.
    // Once unleashed it cannot be stopped; the heartbeat below must pet it.
    let mut watchdog =
        embassy_stm32::wdg::IndependentWatchdog::new(p.IWDG1, boot::watchdog_timeout_us());
    watchdog.unleash();
    defmt::info!("IWDG armed: timeout={=u32}ms", boot::WATCHDOG_TIMEOUT_MS);

    // Step 5: application tasks. Audio/USB/shell wiring hangs off this loop
    // in the product build; the heartbeat and watchdog discipline live here.
    let mut tick = 0u32;
    loop {
        Timer::after(Duration::from_secs(1)).await;
        tick = tick.wrapping_add(1);
        defmt::debug!("heartbeat tick={=u32}", tick);
        watchdog.pet();
    }
}
