//! Mutex-guarded façade for application-mode flash access.
//!
//! The driver and utility layers are not thread-safe by contract (command/
//! address/data phases of a transaction are not atomic against another
//! context's transaction), and they deliberately contain no locking so the
//! core stays allocation-free and host-testable without a scheduler.
//!
//! When the application image shares one flash instance between tasks, this
//! façade serializes each *logical operation* behind a critical-section
//! mutex instead of sprinkling locks inside the driver.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::transport::QspiTransport;
use crate::util::FlashUtil;

/// A [`FlashUtil`] behind a critical-section mutex.
///
/// Each closure passed to [`SharedFlash::with`] runs as one critical
/// section; keep the work inside to a single logical flash operation —
/// a chip erase inside a critical section stalls every interrupt for its
/// full ~100 s budget.
pub struct SharedFlash<T: QspiTransport> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<FlashUtil<T>>>,
}

impl<T: QspiTransport> SharedFlash<T> {
    /// Wrap a utility instance.
    pub fn new(util: FlashUtil<T>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(util)),
        }
    }

    /// Run one logical flash operation under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut FlashUtil<T>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::NorDriver;
    use crate::sim::{SimFlash, SIM_DEVICE, SIM_SIZE};

    #[test]
    fn test_shared_flash_serializes_operations() {
        let mut driver = NorDriver::new(SimFlash::<SIM_SIZE>::new(), SIM_DEVICE);
        driver.init().unwrap();
        let shared = SharedFlash::new(FlashUtil::new(driver));

        shared.with(|u| u.write_with_erase(0x100, &[7u8; 16])).unwrap();
        let mut buf = [0u8; 16];
        shared.with(|u| u.read(0x100, &mut buf)).unwrap();
        assert_eq!(buf, [7u8; 16]);
        assert_eq!(shared.with(|u| u.stats().writes), 1);
    }
}
