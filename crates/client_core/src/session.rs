//! Session container: mirrors the remote auth state for UI consumers.

use std::sync::Arc;

use shared::domain::Identity;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::{debug, error, info, warn};

use crate::remote::{error_text, AuthApi, RemoteResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<Identity>,
    /// False until the first session check (or auth notification) completes.
    pub is_auth_checked: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct SessionStore {
    auth: Arc<dyn AuthApi>,
    state: Arc<watch::Sender<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            auth,
            state: Arc::new(state),
            listener: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<Identity> {
        self.state.borrow().user.clone()
    }

    /// Starts following auth notifications and checks the current session.
    pub async fn init(&self) {
        self.listen().await;
        self.check_session().await;
    }

    /// Mirrors every auth notification into local state until the store is
    /// dropped. Calling it again is a no-op.
    pub async fn listen(&self) {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return;
        }

        let mut changes = BroadcastStream::new(self.auth.on_auth_state_change());
        let state = Arc::clone(&self.state);
        *listener = Some(tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                match change {
                    Ok(change) => {
                        debug!(event = ?change.event, "auth state changed");
                        let user = change.user().cloned();
                        state.send_modify(|s| {
                            s.user = user;
                            s.is_auth_checked = true;
                        });
                    }
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth notifications lagged");
                    }
                }
            }
        }));
    }

    /// Returns true when the remote lookup succeeded.
    pub async fn check_session(&self) -> bool {
        self.begin(true);
        let outcome = self.auth.get_user().await;
        let ok = outcome.is_ok();
        if let Err(err) = &outcome {
            error!(error = %err, "error fetching user");
        }

        self.state.send_modify(|s| {
            match outcome {
                Ok(user) => s.user = user,
                Err(err) => {
                    s.user = None;
                    s.error = Some(error_text(&err));
                }
            }
            s.is_loading = false;
            s.is_auth_checked = true;
        });
        ok
    }

    pub async fn register(&self, email: &str, password: &str) -> bool {
        self.begin(true);
        let result = self.auth.sign_up(email, password).await;
        self.complete_auth("sign up", result).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> bool {
        self.begin(true);
        let result = self.auth.sign_in_with_password(email, password).await;
        self.complete_auth("sign in", result).await
    }

    /// Drops the local identity whatever the remote call reports.
    pub async fn sign_out(&self) {
        self.begin(false);
        if let Err(err) = self.auth.sign_out().await {
            warn!(error = %err, "sign out failed remotely");
        }
        self.state.send_modify(|s| s.user = None);
        info!("signed out");
    }

    fn begin(&self, loading: bool) {
        self.state.send_modify(|s| {
            s.error = None;
            if loading {
                s.is_loading = true;
            }
        });
    }

    async fn complete_auth(&self, action: &'static str, result: RemoteResult<()>) -> bool {
        let ok = match result {
            // Populate the identity from the session that was just created.
            Ok(()) => self.check_session().await,
            Err(err) => {
                error!(action, error = %err, "authentication failed");
                self.state
                    .send_modify(|s| s.error = Some(error_text(&err)));
                false
            }
        };
        self.state.send_modify(|s| s.is_loading = false);
        ok
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
