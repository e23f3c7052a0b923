//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the media library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other `core-*` crate depends on this one for its logging
//! conventions, its validated configuration and the typed events it
//! broadcasts to the UI layer.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
