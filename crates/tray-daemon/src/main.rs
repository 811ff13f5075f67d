use tracing::{error, info};
use tray_config::TrayConfig;
use tray_daemon::DaemonConfig;
use tray_paths::TrayPaths;

fn main() {
    tray_core::init_logging(false);
    info!(event = "daemon.start_started");

    let exit_code = match run() {
        Ok(()) => {
            info!(event = "daemon.start_completed");
            0
        }
        Err(e) => {
            error!(event = "daemon.start_failed", error = %e);
            eprintln!("tray-daemon: {}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let paths = TrayPaths::resolve()?;
    let tray = TrayConfig::load(&paths)?;
    tray.validate()?;

    eprintln!(
        "Starting tray daemon in foreground (PID: {})...",
        std::process::id()
    );

    let config = DaemonConfig::from_paths(&paths);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(tray_daemon::run_server(config, tray))?;
    Ok(())
}
