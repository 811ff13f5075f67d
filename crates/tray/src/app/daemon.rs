use clap::{Arg, ArgAction, Command, value_parser};

pub fn daemon_command() -> Command {
    Command::new("daemon")
        .about("Run and inspect the background monitor")
        .long_about(
            "The daemon polls the 3Dify backend, raises desktop notifications, and \
             supervises the local worker. The other tray commands talk to it over \
             its control endpoint.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("start")
                .about("Start monitoring in the background")
                .arg(
                    Arg::new("foreground")
                        .long("foreground")
                        .help("Stay attached and log to this terminal")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("stop")
                .about("Stop monitoring; a running local worker is stopped too")
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .help("Seconds to wait for the daemon to exit")
                        .value_name("SECS")
                        .value_parser(value_parser!(u64).range(1..=120))
                        .default_value("5"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show whether the daemon is up, polling, and reaching the backend")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
}
