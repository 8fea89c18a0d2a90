use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Identity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Session issued by the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_utc().is_some_and(|expires| expires <= now)
    }
}

/// Sign-up answers with a full session when the account is confirmed
/// immediately, or with the bare user while confirmation is pending.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    User(Identity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Payload of the auth notification stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthChangeEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    pub fn new(event: AuthChangeEvent, session: Option<AuthSession>) -> Self {
        Self { event, session }
    }

    pub fn user(&self) -> Option<&Identity> {
        self.session.as_ref().map(|session| &session.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_response_distinguishes_session_from_pending_user() {
        let session: SignUpResponse = serde_json::from_value(serde_json::json!({
            "access_token": "tok",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_700_000_000,
            "refresh_token": "ref",
            "user": {"id": "u-1", "email": "a@example.com"}
        }))
        .expect("session");
        assert!(matches!(session, SignUpResponse::Session(_)));

        let pending: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": "u-2",
            "email": "b@example.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        }))
        .expect("pending user");
        match pending {
            SignUpResponse::User(user) => assert_eq!(user.id.as_str(), "u-2"),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn session_expiry_uses_absolute_timestamp() {
        let session = AuthSession {
            access_token: "tok".into(),
            token_type: default_token_type(),
            expires_in: Some(3600),
            expires_at: Some(1_700_000_000),
            refresh_token: None,
            user: Identity::new("u-1", None),
        };
        let before = Utc.timestamp_opt(1_699_999_999, 0).single().expect("ts");
        let after = Utc.timestamp_opt(1_700_000_001, 0).single().expect("ts");
        assert!(!session.is_expired(before));
        assert!(session.is_expired(after));
    }
}
