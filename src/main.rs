#[tokio::main]
async fn main() -> std::process::ExitCode {
    todo_client_lib::run().await
}
