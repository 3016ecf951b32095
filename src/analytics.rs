//! Analytics logging for completed pipeline runs.
//!
//! Fire-and-forget: an unavailable or failing analytics database must
//! never block or fail the pipeline, so every write degrades to a warning
//! log.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::models::ProcessingOutcome;

/// One completed-run record.
#[derive(Debug, Clone)]
pub struct ProcessingRecord {
    pub filename: String,
    pub category: String,
    pub confidence: f64,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
    pub file_size: u64,
    /// "success", "empty_document" or "error".
    pub status: String,
    pub error_msg: Option<String>,
}

impl From<&ProcessingOutcome> for ProcessingRecord {
    fn from(outcome: &ProcessingOutcome) -> Self {
        Self {
            filename: outcome.filename.clone(),
            category: outcome.category.clone(),
            confidence: outcome.confidence,
            processing_time: outcome.duration.as_secs_f64(),
            file_size: outcome.size_bytes,
            status: outcome.status.as_str().to_string(),
            error_msg: outcome.error.clone(),
        }
    }
}

/// Aggregate view for the status command.
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub avg_confidence: f64,
    /// (category, document count), most frequent first.
    pub by_category: Vec<(String, u64)>,
}

/// SQLite-backed analytics log.
pub struct AnalyticsLogger {
    conn: Mutex<Connection>,
}

impl AnalyticsLogger {
    /// Open (or create) the analytics database.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS document_processing (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                processing_time REAL NOT NULL,
                file_size INTEGER NOT NULL,
                status TEXT NOT NULL,
                error_msg TEXT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_processing_status
                ON document_processing(status);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a completed run. Never fails the caller.
    pub fn log(&self, record: &ProcessingRecord) {
        if let Err(e) = self.try_log(record) {
            tracing::warn!("Analytics logging failed for {}: {}", record.filename, e);
        }
    }

    fn try_log(&self, record: &ProcessingRecord) -> anyhow::Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("analytics connection poisoned"))?;
        conn.execute(
            "INSERT INTO document_processing
                (filename, doc_type, confidence, processing_time, file_size, status, error_msg)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.filename,
                record.category,
                record.confidence,
                record.processing_time,
                record.file_size as i64,
                record.status,
                record.error_msg,
            ],
        )?;
        Ok(())
    }

    /// Aggregate processing statistics.
    pub fn stats(&self) -> anyhow::Result<ProcessingStats> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("analytics connection poisoned"))?;

        let (total, succeeded, failed, avg_confidence) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'success'), 0),
                    COALESCE(SUM(status = 'error'), 0),
                    COALESCE(AVG(confidence), 0.0)
             FROM document_processing",
            [],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?;

        let mut stmt = conn.prepare(
            "SELECT doc_type, COUNT(*) AS n FROM document_processing
             GROUP BY doc_type ORDER BY n DESC",
        )?;
        let by_category = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProcessingStats {
            total,
            succeeded,
            failed,
            avg_confidence,
            by_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(category: &str, confidence: f64, status: &str) -> ProcessingRecord {
        ProcessingRecord {
            filename: "doc.pdf".to_string(),
            category: category.to_string(),
            confidence,
            processing_time: 0.5,
            file_size: 1024,
            status: status.to_string(),
            error_msg: None,
        }
    }

    #[test]
    fn test_log_and_stats() {
        let dir = tempdir().unwrap();
        let logger = AnalyticsLogger::open(&dir.path().join("analytics.db")).unwrap();

        logger.log(&record("jugement", 90.0, "success"));
        logger.log(&record("jugement", 70.0, "success"));
        logger.log(&record("non_classifies", 0.0, "error"));

        let stats = logger.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert!((stats.avg_confidence - (160.0 / 3.0)).abs() < 1e-9);
        assert_eq!(stats.by_category[0].0, "jugement");
        assert_eq!(stats.by_category[0].1, 2);
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analytics.db");
        let first = AnalyticsLogger::open(&path).unwrap();
        first.log(&record("contrat", 60.0, "success"));
        drop(first);

        let second = AnalyticsLogger::open(&path).unwrap();
        assert_eq!(second.stats().unwrap().total, 1);
    }
}
