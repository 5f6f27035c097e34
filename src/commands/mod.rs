//! Command handlers for emovox.
//!
//! # Commands
//! - `record`: Interactive recording and upload session (default)
//! - `predict`: One-shot prediction for an audio file
//! - `account`: Signup and login prompts
//! - `history`: Stored predictions
//! - `config`: Open the configuration file in the user's editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod account;
pub mod config;
pub mod history;
pub mod list_devices;
pub mod logs;
pub mod predict;
pub mod record;

pub use account::{handle_login, handle_signup};
pub use config::handle_config;
pub use history::handle_history;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use predict::handle_predict;
pub use record::handle_record;
