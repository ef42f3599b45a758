//! Wall-clock platform for hosted targets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use cadena_core::Platform;

type FatalHook = Box<dyn Fn(&str) + Send + Sync>;

/// [`Platform`] backed by `std::time` and `tracing`.
///
/// Cycle counts are synthesized from elapsed wall time at a nominal core
/// clock, so tier budgets expressed in cycles translate directly to wall
/// time. The control section is a spin lock: control work is rare and
/// short, and spinning keeps the trait's lock/unlock pair free of poisoning
/// concerns.
pub struct HostPlatform {
    started: Instant,
    clock_hz: u32,
    locked: AtomicBool,
    fatal_hook: Option<FatalHook>,
}

impl HostPlatform {
    /// A platform modelling a core clocked at `clock_hz`.
    pub fn new(clock_hz: u32) -> Self {
        Self { started: Instant::now(), clock_hz, locked: AtomicBool::new(false), fatal_hook: None }
    }

    /// A platform at the default 600 MHz reference clock.
    pub fn with_default_clock() -> Self {
        Self::new(600_000_000)
    }

    /// Installs a callback invoked on every fatal node error, after the
    /// error is logged. Integrators use it to stop I/O or flush state.
    #[must_use]
    pub fn with_fatal_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.fatal_hook = Some(Box::new(hook));
        self
    }
}

impl Platform for HostPlatform {
    fn core_clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn current_cycles(&self) -> u32 {
        let nanos = self.started.elapsed().as_nanos();
        let cycles = nanos * u128::from(self.clock_hz) / 1_000_000_000;
        // the trait contract is a free-running u32 that wraps
        #[allow(clippy::cast_possible_truncation)]
        {
            cycles as u32
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "cadena", "{message}");
    }

    fn control_lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    fn control_unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn on_fatal_error(&self, message: &str) {
        tracing::error!(target: "cadena", "fatal: {message}");
        if let Some(hook) = &self.fatal_hook {
            hook(message);
        }
    }
}
