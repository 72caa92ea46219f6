use async_trait::async_trait;
use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    QueryBuilder, Row, Transaction,
};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{
    Collection, Condition, Document, DocumentStore, Filter, FindOptions, SortOrder,
    StoreTransaction, CREATED_AT_FIELD,
};

/// SQLite-backed document store: one `documents` table keyed by
/// (collection, id) holding each document as JSON text
pub struct SqliteStore {
    pool: SqlitePool,
}

fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn json_path(field: &str) -> String {
    format!("$.{}", field)
}

fn map_write_error(err: sqlx::Error, context: String) -> AppError {
    let unique = err
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false);
    if unique {
        AppError::Conflict(context)
    } else {
        AppError::Database(format!("{}: {}", context, err))
    }
}

/// Appends `WHERE collection = ? AND <conditions>` to the builder
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, collection: Collection, filter: &Filter) {
    qb.push(" WHERE collection = ");
    qb.push_bind(collection.as_str());

    for condition in &filter.conditions {
        match condition {
            Condition::Eq { field, value } => {
                qb.push(" AND json_extract(data, ");
                qb.push_bind(json_path(field));
                qb.push(") IS ");
                qb.push_bind(value.clone());
            }
            Condition::Ne { field, value } => {
                qb.push(" AND json_extract(data, ");
                qb.push_bind(json_path(field));
                qb.push(") IS NOT ");
                qb.push_bind(value.clone());
            }
            Condition::Contains { fields, needle } => {
                if fields.is_empty() {
                    qb.push(" AND 0");
                    continue;
                }
                qb.push(" AND (");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("instr(lower(json_extract(data, ");
                    qb.push_bind(json_path(field));
                    qb.push(")), lower(");
                    qb.push_bind(needle.clone());
                    qb.push(")) > 0");
                }
                qb.push(")");
            }
        }
    }
}

fn parse_document(raw: &str) -> AppResult<Document> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Database(format!("Corrupt document in store: {}", e)))
}

impl SqliteStore {
    /// Connect and create the schema. `sqlite::memory:` URLs are limited to
    /// one connection, since every connection would otherwise open its own
    /// empty database.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        if !in_memory {
            ensure_parent_dir(url)?;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::Database(format!("Invalid SQLite URL {}: {}", url, e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to {}: {}", url, e)))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection_created ON documents(collection, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create documents index: {}", e)))?;

        Ok(())
    }
}

fn ensure_parent_dir(url: &str) -> AppResult<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT data FROM documents");
        push_filter(&mut qb, collection, filter);

        let direction = match options.sort.as_ref().map(|(_, order)| *order) {
            Some(SortOrder::Desc) => "DESC",
            _ => "ASC",
        };
        match &options.sort {
            Some((field, _)) if field == CREATED_AT_FIELD => {
                qb.push(format!(" ORDER BY created_at {d}, rowid {d}", d = direction));
            }
            Some((field, _)) => {
                qb.push(" ORDER BY json_extract(data, ");
                qb.push_bind(json_path(field));
                qb.push(format!(") {d}, rowid {d}", d = direction));
            }
            None => {
                qb.push(" ORDER BY rowid ASC");
            }
        }

        qb.push(" LIMIT ");
        qb.push_bind(options.limit.map(|l| l as i64).unwrap_or(-1));
        qb.push(" OFFSET ");
        qb.push_bind(options.skip as i64);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to query {}: {}", collection, e)))?;

        rows.iter()
            .map(|row| parse_document(&row.get::<String, _>("data")))
            .collect()
    }

    async fn find_by_id(&self, collection: Collection, id: &str) -> AppResult<Option<Document>> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to get {} {}: {}", collection, id, e))
            })?;

        row.map(|row| parse_document(&row.get::<String, _>("data")))
            .transpose()
    }

    async fn insert(&self, collection: Collection, id: &str, doc: Document) -> AppResult<()> {
        let now = current_time_millis();
        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(doc.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, format!("Document {} already exists in {}", id, collection)))?;
        tracing::debug!("Inserted {} {}", collection, id);
        Ok(())
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        doc: Document,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE documents SET data = ?, updated_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(doc.to_string())
        .bind(current_time_millis())
        .bind(collection.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update {} {}: {}", collection, id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_if(
        &self,
        collection: Collection,
        id: &str,
        expected: &Filter,
        doc: Document,
    ) -> AppResult<bool> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE documents SET data = ");
        qb.push_bind(doc.to_string());
        qb.push(", updated_at = ");
        qb.push_bind(current_time_millis());
        push_filter(&mut qb, collection, expected);
        qb.push(" AND id = ");
        qb.push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            AppError::Database(format!("Failed to update {} {}: {}", collection, id, e))
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to delete {} {}: {}", collection, id, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM documents");
        push_filter(&mut qb, collection, filter);
        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            AppError::Database(format!("Failed to delete from {}: {}", collection, e))
        })?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents");
        push_filter(&mut qb, collection, filter);
        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to count {}: {}", collection, e)))?;
        Ok(count as u64)
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn delete_by_id(&mut self, collection: Collection, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to delete {} {}: {}", collection, id, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&mut self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM documents");
        push_filter(&mut qb, collection, filter);
        let result = qb.build().execute(&mut *self.tx).await.map_err(|e| {
            AppError::Database(format!("Failed to delete from {}: {}", collection, e))
        })?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::Transaction(format!("Failed to commit transaction: {}", e)))
    }

    async fn abort(self: Box<Self>) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::Transaction(format!("Failed to rollback transaction: {}", e)))
    }
}
