use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;

use crate::error::ClientError;
use crate::models::{Credentials, ErrorBody, LoginResponse};
use crate::storage::{Storage, TOKEN_KEY};

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";
pub const CONNECT_FAILED_MESSAGE: &str = "Failed to connect or log in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// `initialize` has not run yet.
    Unknown,
    LoggedOut,
    LoggedIn,
}

/// What the task client needs from a session: headers for the next request,
/// whether a token is present, and a way to force a logout on 401.
pub trait AuthSession: Send + Sync {
    fn auth_headers(&self) -> BTreeMap<String, String>;
    fn has_token(&self) -> bool;
    fn logout(&self);
}

/// Owns the bearer token, its persisted copy, the readiness flag and the last
/// login error. Clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionData>>,
    storage: Storage,
    http: reqwest::Client,
    login_url: String,
}

#[derive(Debug, Default)]
struct SessionData {
    token: Option<String>,
    is_ready: bool,
    last_error: String,
}

impl SessionStore {
    pub fn new(storage: Storage, http: reqwest::Client, api_base_url: &str) -> Self {
        let login_url = format!("{}/auth/login", api_base_url.trim_end_matches('/'));
        Self {
            inner: Arc::new(Mutex::new(SessionData::default())),
            storage,
            http,
            login_url,
        }
    }

    /// Restores a persisted token, then marks the session ready. Runs once;
    /// later calls return without touching storage.
    pub fn initialize(&self) {
        let mut guard = self.inner.lock().expect("session poisoned");
        if guard.is_ready {
            return;
        }
        match self.storage.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                log::info!("session restored from storage");
                guard.token = Some(token);
            }
            Ok(_) => log::debug!("no persisted session"),
            Err(err) => log::warn!("failed to read persisted session: {err}"),
        }
        guard.is_ready = true;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        self.set_last_error("");
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        log::info!("login attempt email={}", credentials.email);

        let resp = match self
            .http
            .post(&self.login_url)
            .json(&credentials)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("login request failed: {err}");
                self.set_last_error(CONNECT_FAILED_MESSAGE);
                return Err(ClientError::ConnectivityFailure(err));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            let message = body.text().unwrap_or(LOGIN_FAILED_MESSAGE).to_string();
            log::warn!("login rejected status={status} message={message}");
            self.set_last_error(&message);
            if status == StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthorized);
            }
            return Err(ClientError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let token = match resp.json::<LoginResponse>().await {
            Ok(data) if !data.token.is_empty() => data.token,
            Ok(_) => {
                self.set_last_error(LOGIN_FAILED_MESSAGE);
                return Err(ClientError::Decode("login response has an empty token".into()));
            }
            Err(err) => {
                self.set_last_error(LOGIN_FAILED_MESSAGE);
                return Err(ClientError::Decode(err.to_string()));
            }
        };

        if let Err(err) = self.storage.set(TOKEN_KEY, &token) {
            // The session still works for this run; it just won't survive a restart.
            log::warn!("failed to persist session token: {err}");
        }
        let mut guard = self.inner.lock().expect("session poisoned");
        guard.token = Some(token);
        guard.last_error.clear();
        log::info!("login succeeded email={}", credentials.email);
        Ok(())
    }

    pub fn logout(&self) {
        let had_token = {
            let mut guard = self.inner.lock().expect("session poisoned");
            guard.token.take().is_some()
        };
        if let Err(err) = self.storage.remove(TOKEN_KEY) {
            log::warn!("failed to remove persisted session token: {err}");
        }
        if had_token {
            log::info!("logged out");
        }
    }

    pub fn auth_headers(&self) -> BTreeMap<String, String> {
        let guard = self.inner.lock().expect("session poisoned");
        let mut headers = BTreeMap::new();
        headers.insert(
            CONTENT_TYPE_HEADER.to_string(),
            JSON_CONTENT_TYPE.to_string(),
        );
        if let Some(token) = guard.token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION_HEADER.to_string(), format!("Bearer {token}"));
        }
        headers
    }

    pub fn token(&self) -> Option<String> {
        let guard = self.inner.lock().expect("session poisoned");
        guard.token.clone()
    }

    pub fn is_ready(&self) -> bool {
        let guard = self.inner.lock().expect("session poisoned");
        guard.is_ready
    }

    pub fn last_error(&self) -> String {
        let guard = self.inner.lock().expect("session poisoned");
        guard.last_error.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        let guard = self.inner.lock().expect("session poisoned");
        match (guard.is_ready, guard.token.as_deref()) {
            (false, _) => SessionPhase::Unknown,
            (true, Some(token)) if !token.is_empty() => SessionPhase::LoggedIn,
            (true, _) => SessionPhase::LoggedOut,
        }
    }

    fn set_last_error(&self, message: &str) {
        let mut guard = self.inner.lock().expect("session poisoned");
        guard.last_error = message.to_string();
    }

    #[cfg(test)]
    fn set_token_for_test(&self, token: Option<&str>) {
        let mut guard = self.inner.lock().expect("session poisoned");
        guard.token = token.map(str::to_string);
    }
}

impl AuthSession for SessionStore {
    fn auth_headers(&self) -> BTreeMap<String, String> {
        SessionStore::auth_headers(self)
    }

    fn has_token(&self) -> bool {
        self.token().is_some_and(|token| !token.is_empty())
    }

    fn logout(&self) {
        SessionStore::logout(self)
    }
}
