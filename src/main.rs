mod api;
mod app;
mod capture;
mod commands;
mod config;
mod controller;
mod history;
mod logging;
mod playback;
mod setup;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal error: {:#}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
