//! Local worker process supervision.
//!
//! The worker runs inside a secondary execution context (a WSL distribution
//! or a local shell) behind a nested `bash -c` that activates its conda
//! environment and then `exec`s the worker, so the spawned handle's lifetime
//! is the worker's lifetime. Locally, signals go straight to that handle.
//! Under WSL the handle is the `wsl` launcher, so interrupts and kills are
//! raised with `pkill` inside the distribution instead.

mod command;
pub mod errors;
mod output;
mod supervisor;

pub use command::{LaunchCommand, interrupt_command, launch_command, orphan_sweep_command};
pub use errors::WorkerError;
pub use output::OutputRing;
pub use supervisor::WorkerSupervisor;
