use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use crate::controller::{CommandResult, TodoController};
use crate::models::{Task, TaskId, Theme};
use crate::session::SessionPhase;

#[derive(Parser, Debug)]
#[command(
    name = "todo-client",
    version,
    about = "Log in to a todo API and manage your task list"
)]
pub struct Cli {
    /// Base URL of the todo API (defaults to $TODO_API_URL or http://localhost:3000).
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Where the session token, theme and logs are kept.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print command results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the session token.
    Logout,
    /// Show session state and theme.
    Status,
    /// List all tasks.
    List,
    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Toggle a task between open and done.
    Done { id: TaskId },
    /// Rename a task.
    Edit {
        id: TaskId,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Delete a task.
    Rm { id: TaskId },
    /// Show or change the theme.
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeArg {
    Dark,
    Light,
    Toggle,
}

const EXIT_NOT_LOGGED_IN: u8 = 2;

pub async fn execute(command: Command, json: bool, controller: &TodoController) -> ExitCode {
    let started = controller.start().await;
    if started.logged_out {
        eprintln!("Session expired. Please log in again.");
    } else if let Some(error) = &started.error {
        log::warn!("initial refresh failed: {error}");
    }

    match command {
        Command::Login { email, password } => {
            let result = controller.submit_login(&email, &password).await;
            if result.ok && !json {
                println!("Logged in as {email}.");
            }
            report_tasks(result, json, controller)
        }
        Command::Logout => {
            controller.logout();
            if !json {
                println!("Logged out.");
            }
            ExitCode::SUCCESS
        }
        Command::Status => {
            let phase = controller.phase();
            let session = controller.session();
            if json {
                let value = serde_json::json!({
                    "logged_in": phase == SessionPhase::LoggedIn,
                    "theme": controller.theme(),
                    "last_error": session.last_error(),
                    "tasks": controller.tasks().len(),
                });
                println!("{value}");
            } else {
                println!("{}", describe_phase(phase));
                println!("theme: {}", controller.theme());
            }
            ExitCode::SUCCESS
        }
        Command::List => {
            if let Some(code) = require_login(controller) {
                return code;
            }
            report_tasks(started, json, controller)
        }
        Command::Add { title } => {
            if let Some(code) = require_login(controller) {
                return code;
            }
            let result = controller.add(&title.join(" ")).await;
            report_tasks(result, json, controller)
        }
        Command::Done { id } => {
            if let Some(code) = require_login(controller) {
                return code;
            }
            let result = controller.toggle_done(id).await;
            report_tasks(result, json, controller)
        }
        Command::Edit { id, title } => {
            if let Some(code) = require_login(controller) {
                return code;
            }
            let result = controller.edit(id, &title.join(" ")).await;
            report_tasks(result, json, controller)
        }
        Command::Rm { id } => {
            if let Some(code) = require_login(controller) {
                return code;
            }
            let result = controller.remove(id).await;
            report_tasks(result, json, controller)
        }
        Command::Theme { mode } => {
            let result = match mode {
                None => {
                    println!("{}", controller.theme());
                    return ExitCode::SUCCESS;
                }
                Some(ThemeArg::Toggle) => controller.toggle_theme(),
                Some(ThemeArg::Dark) => controller.set_theme(Theme::Dark),
                Some(ThemeArg::Light) => controller.set_theme(Theme::Light),
            };
            if json {
                print_json(&result);
            } else if let Some(theme) = result.data {
                println!("{theme}");
            } else if let Some(error) = result.error {
                eprintln!("{error}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

fn require_login(controller: &TodoController) -> Option<ExitCode> {
    if controller.phase() == SessionPhase::LoggedIn {
        return None;
    }
    eprintln!("Not logged in. Run `todo-client login --email <EMAIL>` first.");
    Some(ExitCode::from(EXIT_NOT_LOGGED_IN))
}

fn report_tasks(
    result: CommandResult<Vec<Task>>,
    json: bool,
    controller: &TodoController,
) -> ExitCode {
    if json {
        print_json(&result);
    } else if let Some(tasks) = &result.data {
        print!("{}", render_tasks(tasks));
    }
    if result.logged_out {
        eprintln!("Session expired. Please log in again.");
        return ExitCode::from(EXIT_NOT_LOGGED_IN);
    }
    if let Some(error) = &result.error {
        if !json {
            eprintln!("{error}");
        }
        if controller.phase() != SessionPhase::LoggedIn {
            return ExitCode::from(EXIT_NOT_LOGGED_IN);
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(error) => eprintln!("failed to encode result: {error}"),
    }
}

fn describe_phase(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Unknown => "session: loading",
        SessionPhase::LoggedOut => "session: logged out",
        SessionPhase::LoggedIn => "session: logged in",
    }
}

pub fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }
    let width = tasks
        .iter()
        .map(|task| task.id.to_string().len())
        .max()
        .unwrap_or(1);
    let mut out = String::new();
    for task in tasks {
        let mark = if task.done { 'x' } else { ' ' };
        out.push_str(&format!(
            "[{mark}] {id:>width$}  {title}  (score {score:.2})\n",
            id = task.id,
            title = task.title,
            score = task.score,
        ));
    }
    out
}
