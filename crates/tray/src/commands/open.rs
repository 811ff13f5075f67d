use clap::ArgMatches;
use tracing::{error, info};

use super::helpers::load_config_with_warning;

pub(crate) fn handle_open_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let admin = matches.get_flag("admin");
    let config = load_config_with_warning();

    let url = match browser_url(&config.server.url, admin) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Cannot open browser: {}", e);
            error!(event = "cli.open_failed", error = %e);
            return Err(e.into());
        }
    };

    info!(event = "cli.open_started", url = %url);
    if let Err(e) = open::that(&url) {
        eprintln!("Failed to open {}: {}", url, e);
        error!(event = "cli.open_failed", url = %url, error = %e);
        return Err(e.into());
    }

    println!("Opened {}", url);
    info!(event = "cli.open_completed", url = %url);
    Ok(())
}

/// The page to open, refusing anything but http(s).
fn browser_url(server_url: &str, admin: bool) -> Result<String, String> {
    let base = server_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err("server URL is not set (use [server] url or SERVER_URL)".to_string());
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(format!("refusing to open non-http(s) URL '{}'", base));
    }

    if admin {
        Ok(format!("{}/admin", base))
    } else {
        Ok(base.to_string())
    }
}
