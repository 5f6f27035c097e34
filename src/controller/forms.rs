//! Signup and login submissions.

use super::View;
use crate::api::{Backend, Credentials};

/// Destinations a successful form submission leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The login form (`/login`)
    Login,
    /// The recording page (`/`)
    Home,
}

impl Location {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Home => "/",
        }
    }
}

/// Sends a signup request, shows the server message and moves to login on success.
///
/// Transport failures are only logged.
pub async fn submit_signup(backend: &dyn Backend, view: &mut impl View, credentials: &Credentials) {
    match backend.signup(credentials).await {
        Ok(response) => {
            tracing::info!(
                "Signup response for {}: success={}",
                credentials.email,
                response.success
            );
            view.alert(&response.message);
            if response.success {
                view.navigate(Location::Login);
            }
        }
        Err(e) => tracing::error!("Signup Error: {:#}", e),
    }
}

/// Sends a login request, shows the server message and moves home on success.
///
/// Transport failures are only logged.
pub async fn submit_login(backend: &dyn Backend, view: &mut impl View, credentials: &Credentials) {
    match backend.login(credentials).await {
        Ok(response) => {
            tracing::info!(
                "Login response for {}: success={}",
                credentials.email,
                response.success
            );
            view.alert(&response.message);
            if response.success {
                view.navigate(Location::Home);
            }
        }
        Err(e) => tracing::error!("Login Error: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{RecordingView, ScriptedBackend};

    fn credentials() -> Credentials {
        Credentials {
            email: "me@example.com".to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_success_navigates_to_login() {
        let backend = ScriptedBackend::authenticating(r#"{"success": true, "message": "ok"}"#);
        let mut view = RecordingView::default();

        submit_signup(&backend, &mut view, &credentials()).await;

        assert_eq!(view.alerts, vec!["ok".to_string()]);
        assert_eq!(view.locations, vec![Location::Login]);
        assert_eq!(
            backend.auth_calls.lock().unwrap().as_slice(),
            ["/signup me@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_signup_rejected_stays_put() {
        let backend = ScriptedBackend::authenticating(
            r#"{"success": false, "message": "Email already exists!"}"#,
        );
        let mut view = RecordingView::default();

        submit_signup(&backend, &mut view, &credentials()).await;

        assert_eq!(view.alerts, vec!["Email already exists!".to_string()]);
        assert!(view.locations.is_empty());
    }

    #[tokio::test]
    async fn test_login_success_navigates_home() {
        let backend = ScriptedBackend::authenticating(r#"{"success": true, "message": "Welcome"}"#);
        let mut view = RecordingView::default();

        submit_login(&backend, &mut view, &credentials()).await;

        assert_eq!(view.alerts, vec!["Welcome".to_string()]);
        assert_eq!(view.locations, vec![Location::Home]);
        assert_eq!(Location::Home.path(), "/");
    }

    #[tokio::test]
    async fn test_login_transport_failure_is_silent() {
        let backend = ScriptedBackend::default();
        let mut view = RecordingView::default();

        submit_login(&backend, &mut view, &credentials()).await;

        assert!(view.alerts.is_empty());
        assert!(view.locations.is_empty());
    }
}
