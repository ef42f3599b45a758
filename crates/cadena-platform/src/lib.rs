//! Cadena Platform - hosted backend
//!
//! A [`Platform`](cadena_core::Platform) implementation for chains running
//! on an operating system: wall-clock cycle counting over `std::time`,
//! warnings and fatal errors routed through `tracing`, and a spin-held
//! control section. Intended for integration tests, simulation, and
//! offline rendering; bare-metal targets implement the trait over their
//! own timers and IRQ masking instead.

pub mod host;

pub use host::HostPlatform;
