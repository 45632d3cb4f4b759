//! SQLite-backed recipe vector store on a vec0 virtual table.

use tokio_rusqlite::Connection;
use tracing::debug;

use crate::search::core::config::StorageConfig;
use crate::search::core::errors::{SearchError, SearchResult};
use crate::search::core::ids::RecipeId;
use crate::search::embedding::EMBEDDING_DIMS;
use crate::search::retrieval::candidates::DistanceMetric;
use crate::search::retrieval::stores::{StoreFuture, VectorStore};

/// Recipe embeddings in a vec0 virtual table.
///
/// The distance metric is baked into the table at creation time, so one
/// store instance serves exactly one metric.
pub struct SqliteRecipeVectorStore {
    conn: Connection,
    table: String,
    metric: DistanceMetric,
}

impl SqliteRecipeVectorStore {
    /// Open the database and create the embedding table if missing.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the sqlite-vec
    /// extension is missing.
    ///
    /// # Note
    /// You must call `init_sqlite_vec_extension()` before calling this
    /// function.
    pub async fn new(config: &StorageConfig, metric: DistanceMetric) -> SearchResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        let table = config.embeddings_table.clone();

        let ddl_table = table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS {ddl_table} USING vec0(
                    recipe_id text primary key,
                    embedding float[{EMBEDDING_DIMS}] distance_metric={metric_name}
                )",
                metric_name = metric.as_str(),
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            table,
            metric,
        })
    }

    /// Insert or replace a recipe embedding.
    ///
    /// # Errors
    /// Rejects vectors whose dimensionality differs from the table's.
    pub async fn upsert(&self, recipe_id: RecipeId, vector: &[f32]) -> SearchResult<()> {
        check_dims(vector)?;
        let table = self.table.clone();
        let encoded = encode_vector(vector)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT OR REPLACE INTO {table} (recipe_id, embedding) VALUES (?1, ?2)"
                    ),
                    rusqlite::params![recipe_id, encoded],
                )?;
                Ok(())
            })
            .await?;
        debug!(%recipe_id, "upserted recipe embedding");
        Ok(())
    }

    /// Delete a recipe embedding, returning whether a row was removed.
    ///
    /// # Errors
    /// Returns an error if the delete cannot be executed.
    pub async fn delete(&self, recipe_id: RecipeId) -> SearchResult<bool> {
        let table = self.table.clone();
        let deleted = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    &format!("DELETE FROM {table} WHERE recipe_id = ?1"),
                    rusqlite::params![recipe_id],
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(deleted)
    }
}

impl VectorStore for SqliteRecipeVectorStore {
    fn nearest_neighbors(
        &self,
        vector: &[f32],
        k: usize,
        metric: DistanceMetric,
    ) -> StoreFuture<'_, SearchResult<Vec<(RecipeId, f64)>>> {
        let encoded = check_dims(vector).and_then(|()| encode_vector(vector));
        let table = self.table.clone();
        let table_metric = self.metric;
        Box::pin(async move {
            if metric != table_metric {
                return Err(SearchError::InvalidConfig(format!(
                    "vector table was created with metric {}, queried with {}",
                    table_metric.as_str(),
                    metric.as_str()
                )));
            }
            let encoded = encoded?;
            let neighbors = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT recipe_id, distance FROM {table}
                         WHERE embedding MATCH ?1
                         ORDER BY distance
                         LIMIT ?2"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![encoded, k as i64], |row| {
                            Ok((row.get::<_, RecipeId>(0)?, row.get::<_, f64>(1)?))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(neighbors)
        })
    }
}

fn check_dims(vector: &[f32]) -> SearchResult<()> {
    if vector.len() != EMBEDDING_DIMS {
        return Err(SearchError::EmbeddingDimension {
            expected: EMBEDDING_DIMS,
            got: vector.len(),
        });
    }
    Ok(())
}

/// vec0 accepts vectors as JSON text; encode once per call.
fn encode_vector(vector: &[f32]) -> SearchResult<String> {
    Ok(serde_json::to_string(vector)?)
}
