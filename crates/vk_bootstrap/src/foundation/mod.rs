//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Logging setup and severity-tagged diagnostic output

pub mod logging;
