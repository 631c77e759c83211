//! Fixed `extern "C"` entry points for STM32CubeProgrammer.
//!
//! The host tool loads the plugin ELF into target RAM and calls these
//! symbols by name with a calling convention and signature set it defines;
//! nothing here is negotiable. Each phase (erase, program, verify) reloads
//! the ELF, so statics — including the driver slot — are reinitialized
//! before every `Init` call.
//!
//! The entry points carry no context pointer, so the one driver instance
//! lives in a critical-section slot.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_stm32::qspi::enums::{
    AddressSize, ChipSelectHighTime, FIFOThresholdLevel, MemorySize,
};
use embassy_stm32::qspi::{Config as QspiConfig, Qspi};
use extflash::hw::HwTransport;
use extflash::W25Q256JV;
use platform::qspi_config::QSPI_PRESCALER;

use crate::adapter::{LoaderCore, FAILURE};

static LOADER: Mutex<RefCell<Option<LoaderCore<HwTransport<'static>>>>> =
    Mutex::new(RefCell::new(None));

fn with_loader<R>(f: impl FnOnce(&mut LoaderCore<HwTransport<'static>>) -> R) -> Option<R> {
    critical_section::with(|cs| LOADER.borrow_ref_mut(cs).as_mut().map(f))
}

/// Bring up clocks + QUADSPI, then reset and identify the part.
///
/// Clocking stays on the 64 MHz HSI default: the host tool connects under
/// reset and owns the power state, so the plugin avoids PLL configuration
/// entirely — QUADSPI runs from rcc_hclk3 at HSI/(prescaler+1), slow but
/// unconditionally safe for programming.
///
/// Returns 1 on success, 0 on failure (bring-up error or JEDEC mismatch).
#[no_mangle]
pub extern "C" fn Init() -> i32 {
    let p = embassy_stm32::init(embassy_stm32::Config::default());

    let mut config = QspiConfig::default();
    config.memory_size = MemorySize::_32MiB;
    config.address_size = AddressSize::_32bit;
    config.prescaler = QSPI_PRESCALER;
    config.cs_high_time = ChipSelectHighTime::_5Cycle;
    config.fifo_threshold = FIFOThresholdLevel::_16Bytes;
    let qspi = Qspi::new_blocking_bank1(
        p.QUADSPI, p.PD11, // IO0
        p.PD12, // IO1
        p.PE2,  // IO2
        p.PD13, // IO3
        p.PB2,  // CLK
        p.PB6,  // NCS
        config,
    );

    let mut core = LoaderCore::new(HwTransport::new(qspi), W25Q256JV);
    let status = core.init();
    critical_section::with(|cs| {
        LOADER.borrow_ref_mut(cs).replace(core);
    });
    status
}

/// Program `size` bytes from `buf` at `addr`. 1 = success.
///
/// # Safety (ABI contract)
///
/// `buf` points to at least `size` readable bytes in target RAM; the host
/// tool staged them there before the call.
#[no_mangle]
pub extern "C" fn Write(addr: u32, size: u32, buf: *const u8) -> i32 {
    if buf.is_null() {
        return FAILURE;
    }
    // SAFETY: the host tool guarantees `buf..buf+size` is readable staged
    // data for the duration of this call (ABI contract above).
    let data = unsafe { core::slice::from_raw_parts(buf, size as usize) };
    with_loader(|l| l.write(addr, data)).unwrap_or(FAILURE)
}

/// Read `size` bytes at `addr` into `buf`. 1 = success. (Some host versions
/// read through the debug port instead and never call this.)
#[no_mangle]
pub extern "C" fn Read(addr: u32, size: u32, buf: *mut u8) -> i32 {
    if buf.is_null() {
        return FAILURE;
    }
    // SAFETY: the host tool guarantees `buf..buf+size` is writable target
    // RAM for the duration of this call.
    let out = unsafe { core::slice::from_raw_parts_mut(buf, size as usize) };
    with_loader(|l| l.read(addr, out)).unwrap_or(FAILURE)
}

/// Erase every sector covering `[start, end)`. 1 = success.
#[no_mangle]
pub extern "C" fn SectorErase(start: u32, end: u32) -> i32 {
    with_loader(|l| l.sector_erase(start, end)).unwrap_or(FAILURE)
}

/// Whole-device erase. 1 = success. Blocks for the chip-erase budget.
#[no_mangle]
pub extern "C" fn MassErase() -> i32 {
    with_loader(|l| l.mass_erase()).unwrap_or(FAILURE)
}

/// Compare flash contents at `mem_addr` against the staged buffer.
///
/// Returns the exclusive end address on success, else the first
/// mismatching address tagged with [`crate::adapter::VERIFY_ERROR_TAG`].
/// `misalign` is the staging buffer's alignment slack: comparison data
/// starts at `ram_addr + misalign`.
#[no_mangle]
#[allow(clippy::arithmetic_side_effects)] // ram_addr + misalign is host-staged, in RAM by contract
pub extern "C" fn Verify(mem_addr: u32, ram_addr: u32, size: u32, misalign: u32) -> u64 {
    // SAFETY: the host tool stages `size` bytes at `ram_addr + misalign`
    // before calling Verify (ABI contract).
    let expected = unsafe {
        core::slice::from_raw_parts(
            (ram_addr as usize + misalign as usize) as *const u8,
            size as usize,
        )
    };
    with_loader(|l| l.verify(mem_addr, expected))
        .unwrap_or(u64::from(mem_addr) | crate::adapter::VERIFY_ERROR_TAG)
}

/// Running byte-sum over `[addr, addr + size)`, seeded with `init`.
#[no_mangle]
pub extern "C" fn CheckSum(addr: u32, size: u32, init: u32) -> u32 {
    with_loader(|l| l.checksum(addr, size, init)).unwrap_or(init)
}
