use clap::ArgMatches;
use tracing::{error, info};
use tray_protocol::{ClientMessage, DaemonMessage, WorkerStatus};

use super::helpers::{report_ipc_error, request_id, run_action, send_request, unexpected_response};

pub(crate) fn handle_worker_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("start", _)) => run_action(
            "start the worker",
            ClientMessage::StartWorker { id: request_id() },
            "Worker started",
        ),
        Some(("stop", _)) => run_action(
            "stop the worker",
            ClientMessage::StopWorker { id: request_id() },
            "Worker stopping",
        ),
        Some(("output", sub)) => handle_worker_output(sub),
        _ => Err("Unknown worker subcommand".into()),
    }
}

fn handle_worker_output(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");
    info!(event = "cli.worker.output_started");

    let request = ClientMessage::WorkerOutput { id: request_id() };
    let worker = match send_request(&request, None) {
        Ok(DaemonMessage::WorkerOutput { worker, .. }) => worker,
        Ok(other) => return Err(unexpected_response(&other)),
        Err(e) => {
            report_ipc_error("read worker output", &e);
            error!(event = "cli.worker.output_failed", error = %e);
            return Err(e.into());
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&worker)?);
    } else {
        println!("{}", worker_summary(&worker));
        for line in &worker.output {
            println!("{}", line);
        }
    }

    info!(
        event = "cli.worker.output_completed",
        running = worker.running,
        lines = worker.output.len()
    );
    Ok(())
}

fn worker_summary(worker: &WorkerStatus) -> String {
    match (worker.running, worker.pid, worker.exit_code) {
        (true, Some(pid), _) => format!("Worker: running (PID: {})", pid),
        (true, None, _) => "Worker: running".to_string(),
        (false, _, Some(code)) => format!("Worker: stopped (last exit code {})", code),
        (false, _, None) => "Worker: stopped".to_string(),
    }
}
