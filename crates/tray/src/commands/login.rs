use std::io::BufRead;
use std::time::Duration;

use clap::ArgMatches;
use tracing::info;
use tray_protocol::ClientMessage;

use super::helpers::{request_id, run_action_with_timeout};

/// The daemon answers a login only after the backend has, so allow for a
/// slow server on top of the daemon's own request timeout.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(45);

pub(crate) fn handle_login_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = match matches.get_one::<String>("username") {
        Some(username) => {
            let password = match matches.get_one::<String>("password") {
                Some(password) => password.clone(),
                None => read_line("Password:")?,
            };
            credentials_request(
                matches.get_one::<String>("server").map(String::as_str),
                username,
                &password,
            )?
        }
        None => {
            let token = match matches.get_one::<String>("token") {
                Some(token) => token.clone(),
                None => read_line("Paste the admin API token and press Enter:")?,
            };
            token_request(&token)?
        }
    };

    info!(
        event = "cli.login_started",
        method = match request {
            ClientMessage::Login { .. } => "password",
            _ => "token",
        }
    );
    run_action_with_timeout(
        "log in",
        request,
        "Signed in; monitoring resumed",
        Some(LOGIN_TIMEOUT),
    )
}

fn read_line(prompt: &str) -> std::io::Result<String> {
    eprintln!("{}", prompt);
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn token_request(token: &str) -> Result<ClientMessage, String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("Token must not be empty".to_string());
    }
    Ok(ClientMessage::SetToken {
        id: request_id(),
        token: token.to_string(),
    })
}

/// Build a `login` request. The password keeps its inner whitespace; only
/// the line ending from stdin is dropped.
fn credentials_request(
    server: Option<&str>,
    username: &str,
    password: &str,
) -> Result<ClientMessage, String> {
    let username = username.trim();
    let password = password.trim_end_matches(['\r', '\n']);
    if username.is_empty() || password.is_empty() {
        return Err("Username and password must not be empty".to_string());
    }
    Ok(ClientMessage::Login {
        id: request_id(),
        server_url: server
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        username: username.to_string(),
        password: password.to_string(),
    })
}
