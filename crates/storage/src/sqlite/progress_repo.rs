use chrono::{DateTime, Utc};
use drill_core::model::{ProgressLog, QuestionId};
use sqlx::Row;
use tracing::debug;

use super::{
    SqliteRepository,
    mapping::{i64_to_usize, question_id_from_i64, question_id_to_i64, ser, usize_to_i64},
};
use crate::repository::{ProgressRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_log(&self) -> Result<Option<ProgressLog>, StorageError> {
        let session_rows = sqlx::query(
            r"
                SELECT position, started_at
                FROM progress_sessions
                ORDER BY position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        if session_rows.is_empty() {
            return Ok(None);
        }

        let mut time: Vec<DateTime<Utc>> = Vec::with_capacity(session_rows.len());
        for (expected, row) in session_rows.iter().enumerate() {
            let position = i64_to_usize("position", row.try_get("position").map_err(ser)?)?;
            if position != expected {
                return Err(StorageError::Corrupt(format!(
                    "session positions are not contiguous: expected {expected}, found {position}"
                )));
            }
            time.push(row.try_get("started_at").map_err(ser)?);
        }

        let mut known: Vec<Vec<QuestionId>> = vec![Vec::new(); time.len()];
        let mut unknown: Vec<Vec<QuestionId>> = vec![Vec::new(); time.len()];

        let verdict_rows = sqlx::query(
            r"
                SELECT session_position, known, question_id
                FROM progress_verdicts
                ORDER BY session_position ASC, known ASC, seq ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        for row in &verdict_rows {
            let position = i64_to_usize(
                "session_position",
                row.try_get("session_position").map_err(ser)?,
            )?;
            let is_known: i64 = row.try_get("known").map_err(ser)?;
            let id = question_id_from_i64(row.try_get("question_id").map_err(ser)?)?;

            let bucket = if is_known == 1 {
                known.get_mut(position)
            } else {
                unknown.get_mut(position)
            };
            bucket
                .ok_or_else(|| {
                    StorageError::Corrupt(format!("verdict for missing session {position}"))
                })?
                .push(id);
        }

        ProgressLog::from_persisted(time, known, unknown)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    async fn save_log(&self, log: &ProgressLog) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Full rewrite, children first.
        sqlx::query("DELETE FROM progress_verdicts")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM progress_sessions")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, entry) in log.entries().enumerate() {
            let position = usize_to_i64("position", position)?;
            sqlx::query(
                r"
                    INSERT INTO progress_sessions (position, started_at)
                    VALUES (?1, ?2)
                ",
            )
            .bind(position)
            .bind(entry.started_at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (flag, ids) in [(1_i64, entry.known), (0_i64, entry.unknown)] {
                for (seq, id) in ids.iter().enumerate() {
                    sqlx::query(
                        r"
                            INSERT INTO progress_verdicts (
                                session_position, known, seq, question_id
                            )
                            VALUES (?1, ?2, ?3, ?4)
                        ",
                    )
                    .bind(position)
                    .bind(flag)
                    .bind(usize_to_i64("seq", seq)?)
                    .bind(question_id_to_i64(*id)?)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                }
            }
        }

        tx.commit().await.map_err(conn)?;
        debug!(entries = log.len(), "progress saved to sqlite");
        Ok(())
    }
}
