//! Workspace placeholder crate.
//!
//! This crate exists to expose feature flags that map to the individual
//! workspace crates. Host applications can depend on `medialib-workspace` and
//! enable `service` (the UI-facing façade, on by default) or `engine` (the raw
//! synchronization engine) without wiring each crate individually.

#[cfg(feature = "service")]
pub use core_service as service;

#[cfg(feature = "engine")]
pub use core_library as library;

#[cfg(feature = "engine")]
pub use core_sync as sync;
