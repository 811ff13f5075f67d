use clap::{Arg, ArgAction, Command};

pub fn status_command() -> Command {
    Command::new("status")
        .about("Show backend worker, GPU, and queue status")
        .arg(
            Arg::new("json")
                .long("json")
                .help("Output as JSON")
                .action(ArgAction::SetTrue),
        )
}

pub fn pause_command() -> Command {
    Command::new("pause").about("Stop the backend from assigning jobs to its GPU worker")
}

pub fn resume_command() -> Command {
    Command::new("resume").about("Let the backend assign jobs to its GPU worker again")
}

pub fn login_command() -> Command {
    Command::new("login")
        .about("Sign the daemon in to the backend and restart polling")
        .long_about(
            "Signs the running daemon in to the backend. With --username the daemon \
             exchanges the credentials for a token at /api/admin/login; the password \
             is read from stdin when --password is omitted. With --token (or no \
             arguments) an existing admin API token is installed as is. --server \
             switches the daemon to another backend first. Tokens are held in \
             memory only.",
        )
        .arg(
            Arg::new("token")
                .long("token")
                .help("Admin API token")
                .value_name("TOKEN")
                .conflicts_with_all(["username", "password", "server"]),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .short('u')
                .help("Admin username")
                .value_name("USER"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Admin password (read from stdin when omitted)")
                .value_name("PASSWORD")
                .requires("username"),
        )
        .arg(
            Arg::new("server")
                .long("server")
                .help("Backend URL to sign in to")
                .value_name("URL")
                .requires("username"),
        )
}

pub fn open_command() -> Command {
    Command::new("open")
        .about("Open the 3Dify web UI in the default browser")
        .arg(
            Arg::new("admin")
                .long("admin")
                .help("Open the admin dashboard instead")
                .action(ArgAction::SetTrue),
        )
}
