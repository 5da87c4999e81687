use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::TaskClient;
use crate::error::ClientError;
use crate::models::{Task, TaskId, Theme};
use crate::session::{AuthSession, SessionPhase, SessionStore};
use crate::theme::ThemePreference;

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Set when the command ended the session (the server answered 401).
    pub logged_out: bool,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
        logged_out: false,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
        logged_out: false,
    }
}

fn logged_out<T>() -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: None,
        logged_out: true,
    }
}

/// View-level state behind the login form and the task list.
#[derive(Clone)]
pub struct TodoController {
    session: SessionStore,
    tasks: TaskClient<SessionStore>,
    view: Arc<Mutex<ViewData>>,
    login_in_flight: Arc<AtomicBool>,
}

#[derive(Debug)]
struct ViewData {
    tasks: Vec<Task>,
    editing: Option<EditDraft>,
    theme: ThemePreference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    pub id: TaskId,
    pub title: String,
}

/// Clears the in-flight flag when a login attempt finishes, however it ends.
struct LoginGuard<'a>(&'a AtomicBool);

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TodoController {
    pub fn new(session: SessionStore, tasks: TaskClient<SessionStore>, theme: ThemePreference) -> Self {
        Self {
            session,
            tasks,
            view: Arc::new(Mutex::new(ViewData {
                tasks: Vec::new(),
                editing: None,
                theme,
            })),
            login_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Restores the session and, if a token came back, loads the list.
    pub async fn start(&self) -> CommandResult<Vec<Task>> {
        self.session.initialize();
        self.refresh().await
    }

    pub async fn submit_login(&self, email: &str, password: &str) -> CommandResult<Vec<Task>> {
        if !self.session.is_ready() {
            return err("session is still loading");
        }
        if email.trim().is_empty() || password.is_empty() {
            return err("email and password are required");
        }
        if self
            .login_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return err("login already in progress");
        }

        let result = {
            let _guard = LoginGuard(&self.login_in_flight);
            self.session.login(email, password).await
        };
        if let Err(error) = result {
            log::debug!("login attempt failed: {error}");
            // The session already holds the user-facing message.
            return err(&self.session.last_error());
        }
        self.refresh().await
    }

    pub fn is_logging_in(&self) -> bool {
        self.login_in_flight.load(Ordering::SeqCst)
    }

    pub fn logout(&self) {
        self.session.logout();
        self.clear_view();
    }

    /// Replaces the cached list with the server's. Does nothing while logged out.
    pub async fn refresh(&self) -> CommandResult<Vec<Task>> {
        if !self.session.has_token() {
            return ok(Vec::new());
        }
        let result = self.tasks.list().await;
        self.apply(result)
    }

    pub async fn add(&self, title: &str) -> CommandResult<Vec<Task>> {
        if title.trim().is_empty() {
            return err("title must not be empty");
        }
        let result = self.tasks.create(title).await;
        self.apply(result)
    }

    pub async fn toggle_done(&self, id: TaskId) -> CommandResult<Vec<Task>> {
        let Some(task) = self.cached(id) else {
            return err("task not found");
        };
        let result = self.tasks.update(task.id, &task.title, !task.done).await;
        self.apply(result)
    }

    pub fn start_edit(&self, id: TaskId) -> CommandResult<EditDraft> {
        let Some(task) = self.cached(id) else {
            return err("task not found");
        };
        let draft = EditDraft {
            id: task.id,
            title: task.title,
        };
        let mut guard = self.view.lock().expect("view poisoned");
        guard.editing = Some(draft.clone());
        ok(draft)
    }

    pub fn cancel_edit(&self) {
        let mut guard = self.view.lock().expect("view poisoned");
        guard.editing = None;
    }

    /// Saves the draft under edit. A blank title keeps the draft open.
    pub async fn save_edit(&self, title: &str) -> CommandResult<Vec<Task>> {
        let Some(draft) = self.editing() else {
            return err("no task is being edited");
        };
        if title.trim().is_empty() {
            return err("title must not be empty");
        }
        let done = self.cached(draft.id).map(|task| task.done).unwrap_or(false);
        let result = self.tasks.update(draft.id, title, done).await;
        let outcome = self.apply(result);
        if outcome.ok {
            self.cancel_edit();
        }
        outcome
    }

    pub async fn edit(&self, id: TaskId, title: &str) -> CommandResult<Vec<Task>> {
        let started = self.start_edit(id);
        if !started.ok {
            return CommandResult {
                ok: false,
                data: None,
                error: started.error,
                logged_out: false,
            };
        }
        self.save_edit(title).await
    }

    pub async fn remove(&self, id: TaskId) -> CommandResult<Vec<Task>> {
        let result = self.tasks.delete(id).await;
        self.apply(result)
    }

    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.view.lock().expect("view poisoned");
        guard.tasks.clone()
    }

    pub fn editing(&self) -> Option<EditDraft> {
        let guard = self.view.lock().expect("view poisoned");
        guard.editing.clone()
    }

    pub fn theme(&self) -> Theme {
        let guard = self.view.lock().expect("view poisoned");
        guard.theme.current()
    }

    pub fn toggle_theme(&self) -> CommandResult<Theme> {
        let mut guard = self.view.lock().expect("view poisoned");
        match guard.theme.toggle() {
            Ok(theme) => ok(theme),
            Err(error) => err(&format!("storage error: {error}")),
        }
    }

    pub fn set_theme(&self, theme: Theme) -> CommandResult<Theme> {
        let mut guard = self.view.lock().expect("view poisoned");
        match guard.theme.set(theme) {
            Ok(theme) => ok(theme),
            Err(error) => err(&format!("storage error: {error}")),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    fn cached(&self, id: TaskId) -> Option<Task> {
        let guard = self.view.lock().expect("view poisoned");
        guard.tasks.iter().find(|task| task.id == id).cloned()
    }

    fn apply(&self, result: Result<Vec<Task>, ClientError>) -> CommandResult<Vec<Task>> {
        match result {
            Ok(tasks) => {
                let mut guard = self.view.lock().expect("view poisoned");
                guard.tasks = tasks.clone();
                ok(tasks)
            }
            Err(ClientError::Unauthorized) => {
                // The task client already logged the session out.
                self.clear_view();
                logged_out()
            }
            Err(error) => {
                log::warn!("task command failed: {error}");
                err(&error.to_string())
            }
        }
    }

    fn clear_view(&self) {
        let mut guard = self.view.lock().expect("view poisoned");
        guard.tasks.clear();
        guard.editing = None;
    }
}
