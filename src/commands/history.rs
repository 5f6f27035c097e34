//! Prediction history listing.

use crate::history::{data_dir, PredictionEntry, PredictionHistory};

/// Prints stored predictions, most recent first.
///
/// # Errors
/// - If the data directory cannot be determined
/// - If the history database cannot be read
pub async fn handle_history() -> Result<(), anyhow::Error> {
    tracing::info!("=== emovox History ===");

    let mut history = PredictionHistory::new(&data_dir()?)?;
    let entries = history.all_predictions()?;

    if entries.is_empty() {
        println!("No prediction history found.");
        return Ok(());
    }

    println!();
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    println!();

    tracing::debug!("Listed {} history entries", entries.len());
    Ok(())
}

fn format_entry(entry: &PredictionEntry) -> String {
    let confidence = entry
        .confidence
        .map(|c| format!(" ({c:.2}%)"))
        .unwrap_or_default();
    format!(
        "  {}  {:<9} {}{}  [{}]",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.source,
        entry.emotion,
        confidence,
        entry.file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn entry(confidence: Option<f64>) -> PredictionEntry {
        PredictionEntry {
            id: 1,
            emotion: "happy".to_string(),
            confidence,
            source: "recorded".to_string(),
            file_name: "recording.wav".to_string(),
            created_at: Local.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_format_entry_with_confidence() {
        let line = format_entry(&entry(Some(87.456)));
        assert!(line.contains("2026-03-04 09:30"));
        assert!(line.contains("happy (87.46%)"));
        assert!(line.contains("[recording.wav]"));
    }

    #[test]
    fn test_format_entry_without_confidence() {
        let line = format_entry(&entry(None));
        assert!(line.contains("happy  [recording.wav]"));
    }
}
