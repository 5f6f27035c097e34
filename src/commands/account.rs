//! Signup and login prompts.
//!
//! A successful signup continues to the login prompt; a successful login opens
//! the recording session.

use std::path::Path;

use cliclack::{input, intro, log, outro, password};
use console::style;

use crate::api::{Credentials, HttpBackend};
use crate::config::EmovoxConfig;
use crate::controller::{self, Location, View};

/// Shows server messages as prompt notes and remembers where to go next.
#[derive(Debug, Default)]
struct AccountView {
    next: Option<Location>,
}

impl View for AccountView {
    fn set_recording_controls(&mut self, _start_enabled: bool, _stop_enabled: bool) {}

    fn set_upload_ready(&mut self, _ready: bool) {}

    fn set_playback(&mut self, _path: &Path) {}

    fn clear_file_input(&mut self) {}

    fn show_result(&mut self, _text: &str) {}

    fn alert(&mut self, message: &str) {
        if let Err(e) = log::info(message) {
            tracing::warn!("Failed to show message: {}", e);
        }
    }

    fn navigate(&mut self, location: Location) {
        tracing::debug!("Navigating to {}", location.path());
        self.next = Some(location);
    }
}

/// Runs the signup prompt, then login on success.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If a prompt is cancelled
pub async fn handle_signup(server: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== emovox Signup ===");
    install_interrupt_handler()?;

    let backend = HttpBackend::new(&server_url(server.as_deref())?);
    intro(style(" signup ").on_white().black())?;

    let credentials = prompt_credentials()?;
    let mut view = AccountView::default();
    controller::submit_signup(&backend, &mut view, &credentials).await;

    if view.next == Some(Location::Login) {
        outro("Account created. Please log in.")?;
        login_flow(server).await
    } else {
        outro("Signup did not complete.")?;
        Ok(())
    }
}

/// Runs the login prompt, then the recording session on success.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If a prompt is cancelled
pub async fn handle_login(server: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== emovox Login ===");
    install_interrupt_handler()?;
    login_flow(server).await
}

async fn login_flow(server: Option<String>) -> Result<(), anyhow::Error> {
    let backend = HttpBackend::new(&server_url(server.as_deref())?);
    intro(style(" login ").on_white().black())?;

    let credentials = prompt_credentials()?;
    let mut view = AccountView::default();
    controller::submit_login(&backend, &mut view, &credentials).await;

    if view.next == Some(Location::Home) {
        outro("Logged in.")?;
        super::handle_record(server).await
    } else {
        outro("Login did not complete.")?;
        Ok(())
    }
}

fn server_url(server: Option<&str>) -> Result<String, anyhow::Error> {
    match server {
        Some(url) => Ok(url.to_string()),
        None => Ok(EmovoxConfig::load()?.server.base_url),
    }
}

fn prompt_credentials() -> Result<Credentials, anyhow::Error> {
    let email: String = input("Email")
        .placeholder("you@example.com")
        .interact()
        .map_err(|e| anyhow::anyhow!("Input cancelled: {e}"))?;
    let password: String = password("Password")
        .mask('▪')
        .interact()
        .map_err(|e| anyhow::anyhow!("Input cancelled: {e}"))?;
    Ok(credentials(&email, password))
}

fn credentials(email: &str, password: String) -> Credentials {
    Credentials {
        email: email.trim().to_string(),
        password,
    }
}

/// Keeps Ctrl+C from killing the process mid-prompt; cliclack reports the cancel.
fn install_interrupt_handler() -> Result<(), anyhow::Error> {
    match ctrlc::set_handler(|| {}) {
        Ok(()) | Err(ctrlc::Error::MultipleHandlers) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("Failed to set Ctrl-C handler: {e}")),
    }
}
