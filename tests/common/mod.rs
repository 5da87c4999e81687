//! In-memory todo backend served through wiremock.

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use todo_client_lib::models::Task;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "pw";
pub const TOKEN: &str = "T1";

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct NewTodo {
    title: String,
}

#[derive(Deserialize)]
struct UpdateTodo {
    title: String,
    done: bool,
}

#[derive(Default)]
struct BackendState {
    tasks: Vec<Task>,
    next_id: i64,
    token: String,
    auth_headers: Vec<Option<String>>,
}

#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub async fn start(seed: Vec<Task>) -> (MockServer, FakeBackend) {
        let next_id = seed.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let backend = FakeBackend {
            state: Arc::new(Mutex::new(BackendState {
                tasks: seed,
                next_id,
                token: TOKEN.to_string(),
                auth_headers: Vec::new(),
            })),
        };
        let server = MockServer::start().await;
        backend.mount(&server).await;
        (server, backend)
    }

    /// Invalidates every token issued so far.
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().token = "rotated".to_string();
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().auth_headers.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }

    async fn mount(&self, server: &MockServer) {
        let state = self.state.clone();
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(move |req: &Request| {
                let guard = state.lock().unwrap();
                match req.body_json::<LoginPayload>() {
                    Ok(p) if p.email == EMAIL && p.password == PASSWORD => {
                        ResponseTemplate::new(200)
                            .set_body_json(serde_json::json!({ "token": guard.token }))
                    }
                    _ => ResponseTemplate::new(401)
                        .set_body_json(serde_json::json!({ "error": "Invalid credentials" })),
                }
            })
            .mount(server)
            .await;

        let state = self.state.clone();
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(move |req: &Request| {
                let mut guard = state.lock().unwrap();
                if !authorized(&mut guard, req) {
                    return unauthorized();
                }
                let mut tasks = guard.tasks.clone();
                tasks.sort_by_key(|t| t.id);
                ResponseTemplate::new(200).set_body_json(tasks)
            })
            .mount(server)
            .await;

        let state = self.state.clone();
        Mock::given(method("POST"))
            .and(path("/todos"))
            .respond_with(move |req: &Request| {
                let mut guard = state.lock().unwrap();
                if !authorized(&mut guard, req) {
                    return unauthorized();
                }
                let Ok(payload) = req.body_json::<NewTodo>() else {
                    return ResponseTemplate::new(400);
                };
                let id = guard.next_id;
                guard.next_id += 1;
                let score = payload.title.len() as f64 / 10.0;
                guard.tasks.push(Task {
                    id,
                    title: payload.title,
                    done: false,
                    score,
                });
                ResponseTemplate::new(201)
            })
            .mount(server)
            .await;

        let state = self.state.clone();
        Mock::given(method("PUT"))
            .and(path_regex(r"^/todos/\d+$"))
            .respond_with(move |req: &Request| {
                let mut guard = state.lock().unwrap();
                if !authorized(&mut guard, req) {
                    return unauthorized();
                }
                let Ok(payload) = req.body_json::<UpdateTodo>() else {
                    return ResponseTemplate::new(400);
                };
                let id = task_id(req);
                match guard.tasks.iter_mut().find(|t| Some(t.id) == id) {
                    Some(task) => {
                        task.title = payload.title;
                        task.done = payload.done;
                        ResponseTemplate::new(204)
                    }
                    None => not_found(),
                }
            })
            .mount(server)
            .await;

        let state = self.state.clone();
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/todos/\d+$"))
            .respond_with(move |req: &Request| {
                let mut guard = state.lock().unwrap();
                if !authorized(&mut guard, req) {
                    return unauthorized();
                }
                let id = task_id(req);
                guard.tasks.retain(|t| Some(t.id) != id);
                ResponseTemplate::new(204)
            })
            .mount(server)
            .await;
    }
}

fn authorized(state: &mut BackendState, req: &Request) -> bool {
    let header = req
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let ok = header.as_deref() == Some(format!("Bearer {}", state.token).as_str());
    state.auth_headers.push(header);
    ok
}

fn task_id(req: &Request) -> Option<i64> {
    req.url.path().rsplit('/').next()?.parse().ok()
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(serde_json::json!({
        "status_code": 401,
        "message": "Missing or invalid authorization token."
    }))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(serde_json::json!({
        "status_code": 404,
        "message": "Resource not found"
    }))
}

pub fn task(id: i64, title: &str, done: bool) -> Task {
    Task {
        id,
        title: title.to_string(),
        done,
        score: 0.0,
    }
}
