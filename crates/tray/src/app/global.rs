use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("tray")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Monitor the 3Dify backend and supervise the local GPU worker")
        .long_about("Talks to the tray daemon, which polls the 3Dify admin API, raises desktop notifications on worker and job changes, and owns the local GPU worker process.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
