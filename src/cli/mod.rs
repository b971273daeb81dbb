//! CLI module for the showroom-compose library
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, BatchSummary, Cli, CUTOUT_SUFFIX, OUTPUT_SUFFIX};
