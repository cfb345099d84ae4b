use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::Row;
use tracing::debug;

use storefront_core::config::SessionConcurrency;
use storefront_core::domain::session::{Session, SessionId};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn version_from_db(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("negative session version `{value}`")))
}

/// Fixed-width UTC text so `updated_at` orders correctly as a string.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn version_to_db(value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("session version `{value}` overflows")))
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT payload, version FROM session WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String =
            row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let version: i64 =
            row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let values: Map<String, Value> = serde_json::from_str(&payload)
            .map_err(|e| RepositoryError::Decode(format!("session payload: {e}")))?;

        Ok(Some(Session::restore(id.clone(), values, version_from_db(version)?)))
    }

    async fn save(
        &self,
        session: &Session,
        mode: SessionConcurrency,
    ) -> Result<u64, RepositoryError> {
        let payload = serde_json::to_string(session.values())
            .map_err(|e| RepositoryError::Decode(format!("session payload: {e}")))?;
        let updated_at = timestamp(Utc::now());

        // Each branch is one statement so the version check and the write take
        // the write lock together.
        let written: Option<i64> = match (mode, session.version()) {
            (SessionConcurrency::LastWriteWins, _) => {
                sqlx::query_scalar(
                    "INSERT INTO session (id, payload, version, updated_at)
                     VALUES (?, ?, 1, ?)
                     ON CONFLICT(id) DO UPDATE SET
                         payload = excluded.payload,
                         version = session.version + 1,
                         updated_at = excluded.updated_at
                     RETURNING version",
                )
                .bind(&session.id().0)
                .bind(&payload)
                .bind(&updated_at)
                .fetch_optional(&self.pool)
                .await?
            }
            (SessionConcurrency::Optimistic, 0) => {
                sqlx::query_scalar(
                    "INSERT INTO session (id, payload, version, updated_at)
                     VALUES (?, ?, 1, ?)
                     ON CONFLICT(id) DO NOTHING
                     RETURNING version",
                )
                .bind(&session.id().0)
                .bind(&payload)
                .bind(&updated_at)
                .fetch_optional(&self.pool)
                .await?
            }
            (SessionConcurrency::Optimistic, expected) => {
                sqlx::query_scalar(
                    "UPDATE session
                     SET payload = ?, version = version + 1, updated_at = ?
                     WHERE id = ? AND version = ?
                     RETURNING version",
                )
                .bind(&payload)
                .bind(&updated_at)
                .bind(&session.id().0)
                .bind(version_to_db(expected)?)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        let Some(version) = written else {
            let found: Option<i64> =
                sqlx::query_scalar("SELECT version FROM session WHERE id = ?")
                    .bind(&session.id().0)
                    .fetch_optional(&self.pool)
                    .await?;
            let found = found.map(version_from_db).transpose()?.unwrap_or(0);
            return Err(RepositoryError::VersionConflict { expected: session.version(), found });
        };
        let version = version_from_db(version)?;

        debug!(
            event_name = "session.saved",
            session_id = %session.id(),
            version,
            "session persisted"
        );
        Ok(version)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM session WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM session WHERE updated_at < ?")
            .bind(timestamp(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
