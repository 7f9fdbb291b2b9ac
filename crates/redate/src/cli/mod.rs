//! Command handlers for the `redate` binary.

pub mod config;
pub mod export;
