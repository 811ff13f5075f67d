//! Building the nested shell invocation.

use tray_config::{ExecutionContext, WorkerConfig, find_unsafe_value};

use super::errors::WorkerError;
use crate::escape::escape_regex;

/// Program plus arguments, ready for `Command::new(program).args(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Wrap `inner` (argv run inside the execution context) with the
    /// context's launcher.
    fn in_context(config: &WorkerConfig, inner: Vec<String>) -> Self {
        match config.context {
            ExecutionContext::Wsl => {
                let mut args = vec!["-d".to_string(), config.distro.clone(), "--".to_string()];
                args.extend(inner);
                Self {
                    program: "wsl".to_string(),
                    args,
                }
            }
            ExecutionContext::Local => {
                let mut inner = inner.into_iter();
                let program = inner.next().unwrap_or_default();
                Self {
                    program,
                    args: inner.collect(),
                }
            }
        }
    }
}

/// Validate the worker settings and build the launch command.
///
/// Checks run before anything is spawned: missing paths first, then shell
/// safety of every interpolated value.
pub fn launch_command(config: &WorkerConfig) -> Result<LaunchCommand, WorkerError> {
    let (Some(worker_dir), Some(activate_script)) =
        (config.worker_dir.as_deref(), config.activate_script.as_deref())
    else {
        return Err(WorkerError::NotConfigured);
    };

    if let Some(name) = find_unsafe_value(config) {
        return Err(WorkerError::UnsafeValue { name });
    }

    let mut script = format!("source '{}' && ", activate_script);
    if let Some(env_name) = config.env_name.as_deref() {
        script.push_str(&format!("conda activate '{}' && ", env_name));
    }
    script.push_str(&format!("cd '{}' && exec {}", worker_dir, config.command));

    Ok(LaunchCommand::in_context(
        config,
        vec!["bash".to_string(), "-c".to_string(), script],
    ))
}

/// `pkill` with `signal` against anything running the worker command,
/// executed inside the execution context.
///
/// The pattern and the distro travel through the context's launcher, so they
/// get the same shell-safety check as the launch command.
fn pkill_in_context(config: &WorkerConfig, signal: &str) -> Result<LaunchCommand, WorkerError> {
    if let Some(name) = find_unsafe_value(config) {
        return Err(WorkerError::UnsafeValue { name });
    }
    Ok(LaunchCommand::in_context(
        config,
        vec![
            "pkill".to_string(),
            signal.to_string(),
            "-f".to_string(),
            escape_regex(&config.command),
        ],
    ))
}

/// Hard-kill sweep for workers that outlived their supervisor.
pub fn orphan_sweep_command(config: &WorkerConfig) -> Result<LaunchCommand, WorkerError> {
    pkill_in_context(config, "-KILL")
}

/// Graceful interrupt delivered inside the execution context.
///
/// `None` for [`ExecutionContext::Local`], where the spawned child is the
/// worker itself and is signalled directly. Under WSL the child is the
/// `wsl` launcher, so the interrupt has to be raised on the Linux side.
pub fn interrupt_command(config: &WorkerConfig) -> Result<Option<LaunchCommand>, WorkerError> {
    match config.context {
        ExecutionContext::Wsl => pkill_in_context(config, "-INT").map(Some),
        ExecutionContext::Local => Ok(None),
    }
}
