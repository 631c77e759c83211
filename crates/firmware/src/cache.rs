//! Cortex-M7 cache maintenance [`CacheOps`] implementation (hardware only).

use crate::relocate::CacheOps;

/// SCB-backed cache operations. Construction steals the core peripherals;
/// create it once, in the early-boot relocation path, before any task or
/// interrupt handler could also be holding them.
pub struct ScbCacheOps {
    scb: cortex_m::peripheral::SCB,
}

impl ScbCacheOps {
    /// # Safety
    ///
    /// Early-boot, single-context use only: no other owner of the Cortex-M
    /// peripherals may exist while this value is alive.
    #[must_use]
    pub unsafe fn new() -> Self {
        // SAFETY: per this constructor's contract.
        let cp = unsafe { cortex_m::Peripherals::steal() };
        Self { scb: cp.SCB }
    }
}

impl CacheOps for ScbCacheOps {
    fn invalidate_dcache_range(&mut self, addr: u32, len: u32) {
        // SAFETY: the relocation destinations are loader-reserved SDRAM;
        // dropping (not cleaning) lines over them cannot lose live data.
        unsafe {
            self.scb
                .invalidate_dcache_by_address(addr as usize, len as usize);
        }
    }

    fn invalidate_icache(&mut self) {
        self.scb.invalidate_icache();
    }

    fn dsb(&mut self) {
        cortex_m::asm::dsb();
    }

    fn isb(&mut self) {
        cortex_m::asm::isb();
    }
}
