mod daemon;
mod global;
mod monitor;
mod worker;


use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(monitor::status_command())
        .subcommand(monitor::pause_command())
        .subcommand(monitor::resume_command())
        .subcommand(monitor::login_command())
        .subcommand(monitor::open_command())
        .subcommand(worker::worker_command())
        .subcommand(daemon::daemon_command())
}
