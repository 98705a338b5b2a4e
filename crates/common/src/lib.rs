//! Common utilities for usbflow
//!
//! This crate provides shared plumbing between the capture engine and the
//! application binary: error handling, logging setup, cooperative shutdown
//! signaling, and display formatting.

pub mod error;
pub mod format;
pub mod logging;
pub mod shutdown;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use shutdown::Shutdown;
