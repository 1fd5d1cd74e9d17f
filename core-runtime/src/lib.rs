//! # Core Runtime
//!
//! Shared runtime infrastructure for the playback core:
//! - Logging and tracing setup (`logging`)
//! - Capability injection and validation (`config`)
//! - Domain event bus (`events`)

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
