use clap::ArgMatches;
use tracing::error;

mod backend;
mod daemon;
mod helpers;
mod login;
mod open;
mod status;
mod worker;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("status", sub_matches)) => status::handle_status_command(sub_matches),
        Some(("pause", _)) => backend::handle_pause_command(),
        Some(("resume", _)) => backend::handle_resume_command(),
        Some(("login", sub_matches)) => login::handle_login_command(sub_matches),
        Some(("open", sub_matches)) => open::handle_open_command(sub_matches),
        Some(("worker", sub_matches)) => worker::handle_worker_command(sub_matches),
        Some(("daemon", sub_matches)) => daemon::handle_daemon_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}
