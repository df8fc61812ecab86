//! Structured logging facility for repomock
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Structured boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use repomock_core::logging_facility::{init, Profile};
//!
//! // Initialize once at test-suite or application startup
//! init(Profile::Development);
//! ```
//!
//! # Boundary ownership
//!
//! `Session` owns lifecycle events for structural mutations. The item store,
//! type registry and membership resolver log only `tracing::debug!` details.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
