//! Configuration file editor command.

use std::process::Command;

use crate::config::config_path;

/// Opens the emovox configuration file in the user's editor.
///
/// Tries `$EDITOR`, then nano, then vi.
///
/// # Errors
/// - If no editor can be found or executed
/// - If the editor exits with an error
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = config_path()?;
    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    tracing::info!("Config file edited successfully");
    Ok(())
}

fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    ["nano", "vi"]
        .iter()
        .find(|editor| is_editor_available(editor))
        .map(|editor| editor.to_string())
        .ok_or_else(|| anyhow::anyhow!("No editor found. Please set the $EDITOR environment variable."))
}

fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
