use tray_protocol::ClientMessage;

use super::helpers::{request_id, run_action};

pub(crate) fn handle_pause_command() -> Result<(), Box<dyn std::error::Error>> {
    run_action(
        "pause the backend worker",
        ClientMessage::PauseWorker { id: request_id() },
        "Backend worker paused",
    )
}

pub(crate) fn handle_resume_command() -> Result<(), Box<dyn std::error::Error>> {
    run_action(
        "resume the backend worker",
        ClientMessage::ResumeWorker { id: request_id() },
        "Backend worker resumed",
    )
}
