//! Plays a recording with the system audio player.

use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Starts playback of `path` in the background and returns the player process.
///
/// macOS uses `open`; Linux tries `xdg-open` then common players.
///
/// # Errors
/// - If the file does not exist
/// - If no player can be started
pub fn play(path: &Path) -> anyhow::Result<Child> {
    if !path.exists() {
        return Err(anyhow::anyhow!("Audio file not found: {}", path.display()));
    }

    tracing::info!("Playing {}", path.display());
    spawn_player(path)
}

#[cfg(target_os = "macos")]
fn spawn_player(path: &Path) -> anyhow::Result<Child> {
    spawn_quiet("open", path).map_err(|e| anyhow::anyhow!("Failed to open audio player: {e}"))
}

#[cfg(target_os = "linux")]
fn spawn_player(path: &Path) -> anyhow::Result<Child> {
    ["xdg-open", "mpv", "vlc", "ffplay", "paplay"]
        .iter()
        .find_map(|player| spawn_quiet(player, path).ok())
        .ok_or_else(|| anyhow::anyhow!("No audio player found. Install mpv, vlc, ffplay, or paplay"))
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn spawn_player(_path: &Path) -> anyhow::Result<Child> {
    Err(anyhow::anyhow!("Playback is not supported on this platform"))
}

/// Spawns `program path` with its output detached from the terminal.
#[cfg(any(target_os = "macos", target_os = "linux"))]
fn spawn_quiet(program: &str, path: &Path) -> std::io::Result<Child> {
    Command::new(program)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error() {
        let err = play(Path::new("/nonexistent/emovox-recording.wav")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
