//! The irreversible platform primitives: MPU/cache bring-up, the jump, and
//! the halt loop. Hardware target only — host tests cover everything up to
//! the [`crate::handoff::BootDecision`]; nothing here is host-testable by
//! design, so it stays as narrow as the hardware allows.

use cortex_m::peripheral::NVIC;
use platform::mpu::MpuApplier;

use crate::image::ValidatedImage;

/// Program the boot-chain MPU regions and enable both caches.
///
/// Must run before the first QSPI transaction and before any code fetch
/// from the XiP window: the default memory map treats the QUADSPI range as
/// Device memory (no instruction fetch), and the D-cache must not come up
/// over DMA-shared AXI SRAM without the non-cacheable region in place
/// (ST AN4838/AN4839, ARM DDI0489F §B3.5).
///
/// # Safety
///
/// Call once, from privileged boot context, before interrupts are enabled
/// and before any peripheral starts DMA.
pub unsafe fn apply_boot_mpu_and_caches() {
    // SAFETY: boot context per this function's contract; nothing else holds
    // the Cortex-M peripherals yet.
    let mut cp = unsafe { cortex_m::Peripherals::steal() };

    // Disable the MPU while reconfiguring (ARM DDI0489F §B3.5.1).
    unsafe {
        cp.MPU.ctrl.write(0);
        for (rbar, rasr) in MpuApplier::boot_register_pairs() {
            cp.MPU.rbar.write(rbar);
            cp.MPU.rasr.write(rasr);
        }
        // ENABLE | PRIVDEFENA: unmapped regions keep the default map for
        // privileged access (stack, internal flash, peripherals).
        cp.MPU.ctrl.write(0b101);
    }
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    cp.SCB.enable_icache();
    cp.SCB.enable_dcache(&mut cp.CPUID);
}

/// Non-returning control transfer into the validated application image.
///
/// The ordering is load-bearing:
///
/// 1. interrupts and SysTick off — an interrupt taken mid-sequence would
///    vector through a partially-updated table;
/// 2. every pending NVIC interrupt cleared;
/// 3. D-cache cleaned — dirty lines (boot diagnostics, config the new
///    image may read) must reach memory before the image runs;
/// 4. VTOR = image base, then DSB + ISB — both barriers are required after
///    a VTOR change before the new table may be used;
/// 5. CONTROL = privileged, MSP-selected, then ISB;
/// 6. MSP set to the validated stack pointer and branch to the validated
///    reset vector, in one assembly primitive (Rust code cannot run between
///    those two — it would execute on the stale stack).
///
/// There is no path back: the caller's stack and vector table are gone the
/// moment step 6 starts.
///
/// # Safety
///
/// `image` must have passed [`crate::image::validate`] against ranges that
/// are actually RAM and actually mapped flash on this board, and the flash
/// must currently be in memory-mapped mode.
pub unsafe fn jump(image: &ValidatedImage) -> ! {
    cortex_m::interrupt::disable();

    // SAFETY: interrupts are off and we never return; exclusive access to
    // the core peripherals from here to the branch.
    let mut cp = unsafe { cortex_m::Peripherals::steal() };

    // SysTick off (counter and its interrupt source).
    cp.SYST.disable_interrupt();
    cp.SYST.disable_counter();

    // Clear all pending NVIC interrupts across every ICPR bank.
    // SAFETY: writing ICPR only clears pending state; no handler can run
    // with PRIMASK set.
    unsafe {
        let nvic = &*NVIC::PTR;
        for icpr in nvic.icpr.iter() {
            icpr.write(0xFFFF_FFFF);
        }
    }

    cp.SCB.clean_dcache(&mut cp.CPUID);

    // Relocate the vector table to the image base. The reset vector sits at
    // +4, so the table base is the vector address masked to the image base.
    // SAFETY: the image base is the validated, memory-mapped flash window.
    unsafe {
        cp.SCB.vtor.write(platform::memory_map::QSPI_MAPPED_BASE);
    }
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    // Privileged thread mode on MSP.
    let mut control = cortex_m::register::control::read();
    control.set_npriv(cortex_m::register::control::Npriv::Privileged);
    control.set_spsel(cortex_m::register::control::Spsel::Msp);
    // SAFETY: switching to MSP in privileged mode before the branch; the
    // bootstrap below reloads MSP anyway.
    unsafe {
        cortex_m::register::control::write(control);
    }
    cortex_m::asm::isb();

    // SAFETY: both values validated; bootstrap sets MSP and branches in
    // assembly, never touching the Rust stack in between.
    unsafe {
        cortex_m::asm::bootstrap(
            image.stack_pointer as *const u32,
            image.reset_vector as *const u32,
        )
    }
}

/// Terminal halt: log-and-stop is the bootloader's only failure mode. The
/// WFE keeps the core in low power between (spurious) events; there is no
/// exit — a bad image must never get a second chance to partially execute.
pub fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}
