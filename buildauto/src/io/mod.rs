//! I/O helpers for buildauto commands.

pub mod backup;
pub mod build_tool;
pub mod config;
pub mod preflight;
pub mod process;
