//! Document repository for database operations on `documents`.

use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::{AppError, DbError, Document, NewDocumentParams};

const COLUMNS: &str = "id, registration_id, doc_type, file_name, file_key, \
     content_type, size_bytes, uploaded_at";

/// Document repository for database operations on `documents`.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a document record and return the stored row.
    ///
    /// The file itself is written to blob storage before this runs; the
    /// row only carries its key.
    pub async fn create(&self, params: NewDocumentParams<'_>) -> Result<Document, AppError> {
        let sql = format!(
            "INSERT INTO documents \
                    (registration_id, doc_type, file_name, file_key, \
                     content_type, size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Document>(&sql)
            .bind(params.registration_id)
            .bind(params.doc_type)
            .bind(params.file_name)
            .bind(params.file_key)
            .bind(params.content_type)
            .bind(params.size_bytes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    AppError::not_found("Registration", params.registration_id)
                }
                other => DbError(other).into(),
            })?;
        Ok(row)
    }

    /// Get a document by id.
    pub async fn get(&self, id: Uuid) -> Result<Document, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError)?
            .ok_or_else(|| AppError::not_found("Document", id))
    }

    /// List documents, optionally restricted to one registration,
    /// newest upload first.
    pub async fn list(&self, registration_id: Option<Uuid>) -> Result<Vec<Document>, AppError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM documents \
             WHERE ($1::uuid IS NULL OR registration_id = $1) \
             ORDER BY uploaded_at DESC"
        );
        let rows = sqlx::query_as::<_, Document>(&sql)
            .bind(registration_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError)?;
        Ok(rows)
    }

    /// Delete a document record, returning it so the caller can clean
    /// up the stored file.
    pub async fn delete(&self, id: Uuid) -> Result<Document, AppError> {
        let sql = format!("DELETE FROM documents WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError)?
            .ok_or_else(|| AppError::not_found("Document", id))
    }
}
