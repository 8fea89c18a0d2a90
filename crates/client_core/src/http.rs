//! HTTP client for a Supabase-compatible backend (auth + data API).

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::Identity,
    error::{ErrorCode, RemoteError},
    protocol::{AuthChange, AuthChangeEvent, AuthSession, Credentials, SignUpResponse},
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    remote::{AuthApi, Query, RemoteResult, TableApi},
};

const AUTH_EVENT_CAPACITY: usize = 64;
const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// Client handle shared by both containers.
///
/// Holds the signed-in session, if any, and attaches its access token to
/// every request.
pub struct ServiceClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<AuthSession>>,
    auth_events: broadcast::Sender<AuthChange>,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: RwLock::new(None),
            auth_events,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.service_url.clone(), settings.anon_key.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    /// Installs a previously persisted session.
    pub async fn restore_session(&self, session: AuthSession) {
        *self.session.write().await = Some(session.clone());
        self.emit(AuthChangeEvent::InitialSession, Some(session));
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<AuthSession>) {
        // No subscribers is fine; the notification is simply dropped.
        let _ = self.auth_events.send(AuthChange::new(event, session));
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn bearer(&self) -> String {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn with_keys(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| RemoteError::transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let fallback = status.canonical_reason().unwrap_or("request failed");
        let err = RemoteError::from_response(status.as_u16(), fallback, &body);
        debug!(status = status.as_u16(), message = %err.message, "remote request rejected");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| RemoteError::decode(format!("unexpected response body: {err}")))
    }

    async fn store_session(&self, session: AuthSession) {
        *self.session.write().await = Some(session.clone());
        self.emit(AuthChangeEvent::SignedIn, Some(session));
    }
}

fn require_filter(query: &Query, operation: &str) -> RemoteResult<()> {
    if query.filters().is_empty() {
        return Err(RemoteError::new(
            ErrorCode::Validation,
            format!("refusing to {operation} without a filter"),
        ));
    }
    Ok(())
}

#[async_trait]
impl AuthApi for ServiceClient {
    async fn get_user(&self) -> RemoteResult<Option<Identity>> {
        let Some(token) = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
        else {
            return Ok(None);
        };

        let request = self.with_keys(self.http.get(self.auth_url("user")), &token);
        let user: Identity = self.send_json(request).await?;
        Ok(Some(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<()> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self
            .with_keys(self.http.post(self.auth_url("signup")), &self.anon_key)
            .json(&body);

        match self.send_json::<SignUpResponse>(request).await? {
            SignUpResponse::Session(session) => {
                info!(user_id = %session.user.id, "signed up");
                self.store_session(session).await;
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "signed up; confirmation pending");
            }
        }
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> RemoteResult<()> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self
            .with_keys(self.http.post(self.auth_url("token")), &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&body);

        let session: AuthSession = self.send_json(request).await?;
        info!(user_id = %session.user.id, "signed in");
        self.store_session(session).await;
        Ok(())
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        let previous = self.session.write().await.take();
        let result = match previous {
            Some(session) => {
                let request = self.with_keys(
                    self.http.post(self.auth_url("logout")),
                    &session.access_token,
                );
                self.send(request).await.map(|_| ())
            }
            None => Ok(()),
        };

        if let Err(err) = &result {
            warn!(error = %err, "logout request failed; local session dropped anyway");
        }
        self.emit(AuthChangeEvent::SignedOut, None);
        result
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChange> {
        self.auth_events.subscribe()
    }
}

#[async_trait]
impl TableApi for ServiceClient {
    async fn select(&self, table: &str, query: &Query) -> RemoteResult<Vec<Value>> {
        let token = self.bearer().await;
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(query.to_pairs());
        debug!(table, ?pairs, "select");

        let request = self
            .with_keys(self.http.get(self.rest_url(table)), &token)
            .query(&pairs);
        self.send_json(request).await
    }

    async fn insert_single(&self, table: &str, row: Value) -> RemoteResult<Value> {
        let token = self.bearer().await;
        debug!(table, "insert");

        let request = self
            .with_keys(self.http.post(self.rest_url(table)), &token)
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, OBJECT_MEDIA_TYPE)
            .json(&json!([row]));
        self.send_json(request).await
    }

    async fn update(&self, table: &str, patch: Value, query: &Query) -> RemoteResult<()> {
        require_filter(query, "update")?;
        let token = self.bearer().await;
        debug!(table, filters = ?query.filters(), "update");

        let request = self
            .with_keys(self.http.patch(self.rest_url(table)), &token)
            .header("Prefer", "return=minimal")
            .query(&query.to_pairs())
            .json(&patch);
        self.send(request).await.map(|_| ())
    }

    async fn delete(&self, table: &str, query: &Query) -> RemoteResult<()> {
        require_filter(query, "delete")?;
        let token = self.bearer().await;
        debug!(table, filters = ?query.filters(), "delete");

        let request = self
            .with_keys(self.http.delete(self.rest_url(table)), &token)
            .query(&query.to_pairs());
        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
