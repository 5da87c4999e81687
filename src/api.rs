use reqwest::{Method, RequestBuilder, Response, StatusCode};

use crate::error::ClientError;
use crate::models::{ErrorBody, NewTask, Task, TaskId, TaskUpdate};
use crate::session::{AuthSession, SessionStore};

/// CRUD access to `/todos`.
///
/// Every request carries the session's headers as they are at send time. A 401
/// from any endpoint logs the session out before the error is returned, and
/// mutations answer with a fresh `list()` instead of patching local state.
#[derive(Clone)]
pub struct TaskClient<S = SessionStore> {
    http: reqwest::Client,
    todos_url: String,
    session: S,
}

impl<S: AuthSession> TaskClient<S> {
    pub fn new(http: reqwest::Client, api_base_url: &str, session: S) -> Self {
        let todos_url = format!("{}/todos", api_base_url.trim_end_matches('/'));
        Self {
            http,
            todos_url,
            session,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub async fn list(&self) -> Result<Vec<Task>, ClientError> {
        let request = self.request(Method::GET, &self.todos_url)?;
        let resp = self.execute(request, "fetch todos").await?;
        resp.json::<Vec<Task>>()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }

    /// The title is sent as given; blank-title filtering belongs to the caller.
    pub async fn create(&self, title: &str) -> Result<Vec<Task>, ClientError> {
        let request = self
            .request(Method::POST, &self.todos_url)?
            .json(&NewTask {
                title: title.to_string(),
            });
        self.execute(request, "create todo").await?;
        self.list().await
    }

    pub async fn update(
        &self,
        id: TaskId,
        title: &str,
        done: bool,
    ) -> Result<Vec<Task>, ClientError> {
        let url = self.task_url(id);
        let request = self.request(Method::PUT, &url)?.json(&TaskUpdate {
            title: title.to_string(),
            done,
        });
        self.execute(request, "update todo").await?;
        self.list().await
    }

    pub async fn delete(&self, id: TaskId) -> Result<Vec<Task>, ClientError> {
        let url = self.task_url(id);
        let request = self.request(Method::DELETE, &url)?;
        self.execute(request, "delete todo").await?;
        self.list().await
    }

    fn task_url(&self, id: TaskId) -> String {
        format!("{}/{id}", self.todos_url)
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ClientError> {
        if !self.session.has_token() {
            return Err(ClientError::NotAuthenticated);
        }
        let mut request = self.http.request(method, url);
        for (name, value) in self.session.auth_headers() {
            request = request.header(name, value);
        }
        Ok(request)
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        action: &'static str,
    ) -> Result<Response, ClientError> {
        let resp = request.send().await.map_err(|err| {
            log::warn!("failed to {action}: {err}");
            ClientError::ConnectivityFailure(err)
        })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            log::warn!("failed to {action}: unauthorized, logging out");
            self.session.logout();
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            let message = body
                .text()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to {action}"));
            log::warn!("failed to {action}: status={status} message={message}");
            return Err(ClientError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }
        log::debug!("{action} ok status={status}");
        Ok(resp)
    }
}
