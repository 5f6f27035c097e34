//! Prediction history storage and retrieval using SQLite.

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// A stored prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEntry {
    pub id: i64,
    pub emotion: String,
    /// Percentage as reported by the server
    pub confidence: Option<f64>,
    /// "recorded" or "uploaded"
    pub source: String,
    pub file_name: String,
    pub created_at: DateTime<Local>,
}

/// Manages the prediction history database.
pub struct PredictionHistory {
    database_path: PathBuf,
    /// Opened on first use
    connection: Option<Connection>,
}

impl PredictionHistory {
    /// Creates a history backed by `predictions.db` inside `data_dir`.
    ///
    /// # Errors
    /// - If the data directory cannot be created
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            database_path: data_dir.join("predictions.db"),
            connection: None,
        })
    }

    fn connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;
            connection.execute(
                "CREATE TABLE IF NOT EXISTS predictions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    emotion TEXT NOT NULL,
                    confidence REAL,
                    source TEXT NOT NULL,
                    file_name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;
            self.connection = Some(connection);
        }

        self.connection
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("History database is not open"))
    }

    /// Stores one prediction.
    ///
    /// # Errors
    /// - If the database cannot be opened or the insert fails
    pub fn save_prediction(
        &mut self,
        emotion: &str,
        confidence: Option<f64>,
        source: &str,
        file_name: &str,
    ) -> Result<()> {
        let created_at = Local::now().to_rfc3339();
        self.connection()?.execute(
            "INSERT INTO predictions (emotion, confidence, source, file_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![emotion, confidence, source, file_name, created_at],
        )?;
        tracing::debug!("Prediction saved to history: {}", emotion);
        Ok(())
    }

    /// All predictions, most recent first.
    ///
    /// # Errors
    /// - If the query fails or a stored timestamp is malformed
    pub fn all_predictions(&mut self) -> Result<Vec<PredictionEntry>> {
        let connection = self.connection()?;
        let mut statement = connection.prepare(
            "SELECT id, emotion, confidence, source, file_name, created_at
             FROM predictions ORDER BY id DESC",
        )?;

        let entries = statement
            .query_map([], |row| {
                let timestamp: String = row.get(5)?;
                let created_at = DateTime::parse_from_rfc3339(&timestamp)
                    .map(|dt| dt.with_timezone(&Local))
                    .map_err(|_| {
                        rusqlite::Error::InvalidParameterName(
                            "Invalid timestamp format".to_string(),
                        )
                    })?;

                Ok(PredictionEntry {
                    id: row.get(0)?,
                    emotion: row.get(1)?,
                    confidence: row.get(2)?,
                    source: row.get(3)?,
                    file_name: row.get(4)?,
                    created_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

/// Directory holding the history database (`~/.local/share/emovox`).
///
/// # Errors
/// - If the home directory cannot be determined
pub fn data_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("emovox"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = PredictionHistory::new(dir.path()).unwrap();

        history
            .save_prediction("calm", Some(55.25), "uploaded", "memo.mp3")
            .unwrap();
        history
            .save_prediction("uncertain", None, "recorded", "recording.wav")
            .unwrap();

        let entries = history.all_predictions().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].emotion, "uncertain");
        assert_eq!(entries[0].confidence, None);
        assert_eq!(entries[1].confidence, Some(55.25));
        assert_eq!(entries[1].file_name, "memo.mp3");
    }

    #[test]
    fn test_history_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        PredictionHistory::new(dir.path())
            .unwrap()
            .save_prediction("angry", Some(91.0), "recorded", "recording.wav")
            .unwrap();

        let entries = PredictionHistory::new(dir.path())
            .unwrap()
            .all_predictions()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "recorded");
    }

    #[test]
    fn test_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = PredictionHistory::new(dir.path()).unwrap();
        assert!(history.all_predictions().unwrap().is_empty());
    }
}
