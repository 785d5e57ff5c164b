//! Hookcheck - timing proxies for host hook implementations
//!
//! This library reflects over classes registered in a host's hook slots,
//! synthesizes proxy subclasses that time every public method call, caches
//! the generated sources, and loads them on demand through the host's
//! class-resolution chain.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod probe;
pub mod reflect;
pub mod synth;
