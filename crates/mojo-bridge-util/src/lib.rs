//! Shared utilities for mojo-bridge.
//!
//! This crate provides common utilities used across the mojo-bridge workspace:
//! - Error handling patterns
//! - Logging setup with tracing
//! - Path utilities for config and log locations

pub mod error;
pub mod log;
pub mod path;

pub use error::{Error, ErrorKind, Result};
