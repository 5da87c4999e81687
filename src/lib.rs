pub mod api;
#[cfg(feature = "app")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod storage;
pub mod theme;

use crate::api::TaskClient;
use crate::config::Config;
use crate::controller::TodoController;
use crate::session::SessionStore;
use crate::storage::Storage;
use crate::theme::ThemePreference;

/// Wires storage, session, task client and theme for one data directory and API.
pub fn build_controller(config: &Config) -> Result<TodoController, reqwest::Error> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("todo-client/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let storage = Storage::new(config.data_dir.clone());
    let session = SessionStore::new(storage.clone(), http.clone(), &config.api_base_url);
    let tasks = TaskClient::new(http, &config.api_base_url, session.clone());
    let theme = ThemePreference::load(storage, config.default_theme);
    Ok(TodoController::new(session, tasks, theme))
}

#[cfg(all(feature = "app", not(test)))]
pub async fn run() -> std::process::ExitCode {
    use clap::Parser;

    let cli = cli::Cli::parse();
    let config = Config::from_env().with_overrides(cli.api_url.clone(), cli.data_dir.clone());

    if let Err(err) = logging::init_logging(&config.data_dir) {
        eprintln!("failed to initialize logging: {err}");
    }
    log::debug!(
        "starting api={} data_dir={}",
        config.api_base_url,
        config.data_dir.display()
    );

    let controller = match build_controller(&config) {
        Ok(controller) => controller,
        Err(err) => {
            log::error!("failed to build http client: {err}");
            eprintln!("failed to build http client: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };
    cli::execute(cli.command, cli.json, &controller).await
}
