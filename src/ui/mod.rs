//! Terminal user interface components.

pub mod session;

pub use session::{SessionCommand, SessionStatus, SessionTui, SessionView};
