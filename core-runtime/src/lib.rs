//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the photo sync core:
//! - Logging and tracing infrastructure
//! - Upload policy configuration
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the sync core and the
//! asset sources depend on. It establishes the logging conventions and the
//! validated configuration every run starts from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{DateRange, UploadConfig, UploadConfigBuilder};
pub use error::{Error, Result};
