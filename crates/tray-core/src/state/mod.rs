//! Snapshot construction and the presentation contract derived from it.

pub mod normalize;
pub mod presentation;

pub use normalize::normalize;
pub use presentation::{TrayStatus, status_lines, tooltip};
