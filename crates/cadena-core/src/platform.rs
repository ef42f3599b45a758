//! Host services the engine needs from its target.
//!
//! The engine itself is target-agnostic: everything that touches a clock, a
//! cycle counter, or a critical section goes through [`Platform`]. A
//! bare-metal target implements it over DWT/SysTick and IRQ masking; a
//! hosted target over `std::time` and a mutex (see the `cadena-platform`
//! crate). [`NullPlatform`] is the inert implementation used by tests that
//! do not care.

use core::sync::atomic::{AtomicU32, Ordering};

/// Services provided by the execution environment.
pub trait Platform: Send + Sync {
    /// Core clock frequency in Hz, for converting cycles to time.
    fn core_clock_hz(&self) -> u32;

    /// Free-running cycle counter. Wraps at `u32::MAX`; consumers must
    /// subtract with wrapping arithmetic.
    fn current_cycles(&self) -> u32;

    /// Milliseconds since the platform started.
    fn elapsed_ms(&self) -> u64;

    /// Reports a tolerable anomaly.
    fn warning(&self, message: &str);

    /// Enters the control critical section. Paired with
    /// [`Platform::control_unlock`]; prefer [`ControlSection`].
    fn control_lock(&self);

    /// Leaves the control critical section.
    fn control_unlock(&self);

    /// Invoked when a tier hook fails at run time, before the error
    /// propagates to the caller.
    fn on_fatal_error(&self, message: &str);
}

/// RAII guard for the platform control section.
pub struct ControlSection<'a> {
    platform: &'a dyn Platform,
}

impl<'a> ControlSection<'a> {
    /// Locks the control section until the guard drops.
    pub fn enter(platform: &'a dyn Platform) -> Self {
        platform.control_lock();
        Self { platform }
    }
}

impl Drop for ControlSection<'_> {
    fn drop(&mut self) {
        self.platform.control_unlock();
    }
}

/// Inert platform: no clock, no lock, warnings dropped.
///
/// The cycle counter still advances by one per read so cycle statistics
/// remain monotonic in tests.
#[derive(Debug, Default)]
pub struct NullPlatform {
    ticks: AtomicU32,
}

impl NullPlatform {
    /// Creates an inert platform.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Platform for NullPlatform {
    fn core_clock_hz(&self) -> u32 {
        1
    }

    fn current_cycles(&self) -> u32 {
        self.ticks.fetch_add(1, Ordering::Relaxed)
    }

    fn elapsed_ms(&self) -> u64 {
        0
    }

    fn warning(&self, _message: &str) {}

    fn control_lock(&self) {}

    fn control_unlock(&self) {}

    fn on_fatal_error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_platform_cycles_are_monotonic() {
        let p = NullPlatform::new();
        let a = p.current_cycles();
        let b = p.current_cycles();
        assert!(b > a);
    }

    #[test]
    fn control_section_is_balanced() {
        // NullPlatform's lock is a no-op; this just pins the RAII shape.
        let p = NullPlatform::new();
        {
            let _guard = ControlSection::enter(&p);
        }
        let _guard = ControlSection::enter(&p);
    }
}
