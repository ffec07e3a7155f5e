//! Pure, deterministic logic: mode substitution, release naming, shared types.
//!
//! Nothing here touches the filesystem or spawns processes.

pub mod mode;
pub mod release_layout;
pub mod types;
