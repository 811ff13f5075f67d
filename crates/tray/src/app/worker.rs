use clap::{Arg, ArgAction, Command};

pub fn worker_command() -> Command {
    Command::new("worker")
        .about("Control the local GPU worker process")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("start").about("Start the local worker"))
        .subcommand(
            Command::new("stop").about("Stop the local worker (SIGINT, then SIGKILL after the grace period)"),
        )
        .subcommand(
            Command::new("output")
                .about("Show whether the worker runs and its recent output")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
}
