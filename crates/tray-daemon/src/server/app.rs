use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tray_config::TrayConfig;
use tray_core::{
    ActionResult, ApiClient, DesktopNotifier, Notification, NotificationEngine, Notifier, Poller,
    WorkerControl, WorkerSupervisor,
};
use tray_protocol::{ClientMessage, DaemonMessage, NormalizedState, PollingStatus};

use crate::errors::DaemonError;

/// Completion messages consumed by the daemon's event loop.
///
/// Poller callbacks carry the polling session they belong to so results from
/// a session that has since been replaced are dropped.
#[derive(Debug)]
pub enum AppEvent {
    StateUpdated {
        session: u64,
        state: NormalizedState,
    },
    AuthRequired {
        session: u64,
    },
    Request {
        message: ClientMessage,
        reply: oneshot::Sender<DaemonMessage>,
    },
    /// Credentials were accepted; switch to `server_url` (when given) and
    /// `token`, then answer `reply`.
    LoginAccepted {
        id: String,
        server_url: Option<String>,
        token: String,
        reply: oneshot::Sender<DaemonMessage>,
    },
}

#[derive(Debug, Clone, Copy)]
enum BackendAction {
    Pause,
    Resume,
}

impl BackendAction {
    fn name(self) -> &'static str {
        match self {
            BackendAction::Pause => "pause",
            BackendAction::Resume => "resume",
        }
    }
}

/// State owned by the event loop: the poller, the worker supervisor, and the
/// latest published snapshot.
pub struct App {
    api: Arc<ApiClient>,
    poller: Poller,
    supervisor: WorkerSupervisor,
    notifications: NotificationEngine,
    events: mpsc::UnboundedSender<AppEvent>,
    latest: Option<NormalizedState>,
    polling: PollingStatus,
    session: u64,
    /// Startup sweep of workers left by a previous daemon.
    orphan_sweep: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(
        config: &TrayConfig,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<Self, DaemonError> {
        let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier);
        Self::with_notifier(config, notifier, events)
    }

    pub fn with_notifier(
        config: &TrayConfig,
        notifier: Arc<dyn Notifier>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<Self, DaemonError> {
        let api = Arc::new(ApiClient::new(
            &config.server.url,
            config.server.token.clone(),
        )?);
        let notifications = NotificationEngine::new(
            notifier,
            Duration::from_secs(config.notifications.dedup_window_secs),
            config.notifications.enabled,
        );
        let supervisor = WorkerSupervisor::new(config.worker.clone());
        let poller = Poller::new(
            api.clone(),
            notifications.clone(),
            Duration::from_millis(config.server.poll_interval_ms),
            config.server.recent_jobs_limit,
            supervisor.subscribe(),
        );

        Ok(Self {
            api,
            poller,
            supervisor,
            notifications,
            events,
            latest: None,
            polling: PollingStatus::Stopped,
            session: 0,
            orphan_sweep: None,
        })
    }

    /// Start polling and, in the background, sweep workers left behind by a
    /// previous daemon.
    pub fn start(&mut self) {
        self.orphan_sweep = Some(self.supervisor.spawn_orphan_sweep());
        self.start_polling();
    }

    fn start_polling(&mut self) {
        self.session += 1;
        let session = self.session;

        let state_tx = self.events.clone();
        let auth_tx = self.events.clone();
        self.poller.start(
            move |state| {
                let _ = state_tx.send(AppEvent::StateUpdated { session, state });
            },
            move || {
                let _ = auth_tx.send(AppEvent::AuthRequired { session });
            },
        );
        self.polling = PollingStatus::Active;
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::StateUpdated { session, state } => {
                if session != self.session {
                    debug!(event = "daemon.app.stale_state_dropped", session = session);
                    return;
                }
                self.latest = Some(state);
            }
            AppEvent::AuthRequired { session } => {
                if session != self.session {
                    debug!(event = "daemon.app.stale_auth_dropped", session = session);
                    return;
                }
                self.on_auth_required();
            }
            AppEvent::Request { message, reply } => self.handle_request(message, reply),
            AppEvent::LoginAccepted {
                id,
                server_url,
                token,
                reply,
            } => {
                let result = self.switch_backend(server_url.as_deref(), token);
                let _ = reply.send(action_response(id, result));
            }
        }
    }

    fn on_auth_required(&mut self) {
        warn!(event = "daemon.app.auth_required", session = self.session);

        self.api.set_token(None);
        self.poller.stop();
        self.polling = PollingStatus::AuthRequired;

        let notifications = self.notifications.clone();
        tokio::task::spawn_blocking(move || {
            notifications.notify(&Notification::login_required());
        });
    }

    fn handle_request(&mut self, message: ClientMessage, reply: oneshot::Sender<DaemonMessage>) {
        debug!(event = "daemon.app.request_received", id = message.id());

        let response = match message {
            ClientMessage::GetState { id } => DaemonMessage::State {
                id,
                polling: self.polling,
                state: self.latest.clone(),
            },
            ClientMessage::PauseWorker { id } => {
                self.spawn_backend_action(id, BackendAction::Pause, reply);
                return;
            }
            ClientMessage::ResumeWorker { id } => {
                self.spawn_backend_action(id, BackendAction::Resume, reply);
                return;
            }
            ClientMessage::StartWorker { id } => action_response(id, self.start_worker()),
            ClientMessage::StopWorker { id } => action_response(id, self.supervisor.stop().into()),
            ClientMessage::WorkerOutput { id } => DaemonMessage::WorkerOutput {
                id,
                worker: self.supervisor.status(),
            },
            ClientMessage::SetToken { id, token } => {
                action_response(id, self.install_token(token))
            }
            ClientMessage::Login {
                id,
                server_url,
                username,
                password,
            } => {
                self.spawn_login(id, server_url, username, password, reply);
                return;
            }
            // Answered by the connection handler; never forwarded.
            ClientMessage::Ping { id } | ClientMessage::DaemonStop { id } => {
                DaemonMessage::Ack { id }
            }
        };

        let _ = reply.send(response);
    }

    fn start_worker(&mut self) -> ActionResult {
        // The sweep would kill a worker started underneath it.
        if self
            .orphan_sweep
            .as_ref()
            .is_some_and(|sweep| !sweep.is_finished())
        {
            return ActionResult::failure(
                "Still cleaning up workers from a previous run, try again shortly",
            );
        }
        self.supervisor.start().into()
    }

    fn install_token(&mut self, token: String) -> ActionResult {
        let token = token.trim();
        if token.is_empty() {
            return ActionResult::failure("Token must not be empty");
        }

        self.api.set_token(Some(token.to_string()));
        self.start_polling();
        info!(event = "daemon.app.token_installed", session = self.session);
        ActionResult::success()
    }

    fn switch_backend(&mut self, server_url: Option<&str>, token: String) -> ActionResult {
        if let Some(url) = server_url
            && let Err(e) = self.api.set_base_url(url)
        {
            return ActionResult::failure(e.to_string());
        }
        self.install_token(token)
    }

    /// Log in off the event loop. Nothing changes unless the backend accepts
    /// the credentials; a new server URL is tried with its own client.
    fn spawn_login(
        &self,
        id: String,
        server_url: Option<String>,
        username: String,
        password: String,
        reply: oneshot::Sender<DaemonMessage>,
    ) {
        let server_url = server_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let api = self.api.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            info!(
                event = "daemon.app.login_started",
                username = %username,
                server_url = server_url.as_deref().unwrap_or(""),
            );

            let result = match server_url.as_deref() {
                Some(url) => match ApiClient::new(url, None) {
                    Ok(client) => client.login(&username, &password).await,
                    Err(e) => Err(e),
                },
                None => api.login(&username, &password).await,
            };

            match result {
                Ok(token) => {
                    info!(event = "daemon.app.login_completed", username = %username);
                    // A closed loop drops `reply`; the connection answers
                    // with daemon_not_running.
                    let _ = events.send(AppEvent::LoginAccepted {
                        id,
                        server_url,
                        token,
                        reply,
                    });
                }
                Err(e) => {
                    warn!(
                        event = "daemon.app.login_failed",
                        username = %username,
                        error = %e
                    );
                    let _ = reply.send(action_response(id, ActionResult::failure(e.to_string())));
                }
            }
        });
    }

    fn spawn_backend_action(
        &self,
        id: String,
        action: BackendAction,
        reply: oneshot::Sender<DaemonMessage>,
    ) {
        let api = self.api.clone();
        tokio::spawn(async move {
            info!(event = "daemon.app.backend_action_started", action = action.name());
            let result = match action {
                BackendAction::Pause => api.pause_worker().await,
                BackendAction::Resume => api.resume_worker().await,
            };
            match &result {
                Ok(()) => info!(
                    event = "daemon.app.backend_action_completed",
                    action = action.name()
                ),
                Err(e) => warn!(
                    event = "daemon.app.backend_action_failed",
                    action = action.name(),
                    error = %e
                ),
            }
            let _ = reply.send(action_response(id, result.into()));
        });
    }

    /// Stop polling and hard-kill the worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.poller.stop();
        self.polling = PollingStatus::Stopped;
        self.supervisor.force_stop();
    }
}

fn action_response(id: String, result: ActionResult) -> DaemonMessage {
    DaemonMessage::ActionResult {
        id,
        ok: result.ok,
        error: result.error,
    }
}
