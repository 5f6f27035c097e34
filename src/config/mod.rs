//! Configuration management for emovox.
//!
//! Settings are stored as TOML in `~/.config/emovox/emovox.toml`.

pub mod file;

pub use file::{config_path, EmovoxConfig};
