//! SQLite-backed recipe attribute store.
//!
//! Attribute rows hold the filterable metadata only; predicate matching is
//! computed in Rust so the match ratio, ingredient ratio, and diet
//! compliance come out of one pass over the row. Predicates stored as plain
//! columns are additionally pushed into SQL as a disjunction to bound the
//! scan; diet and ingredient predicates live in JSON columns and a row can
//! qualify on those alone, so their presence keeps the scan full.

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::search::core::config::StorageConfig;
use crate::search::core::errors::SearchResult;
use crate::search::core::filters::{DietType, Difficulty, FilterSet, RecipeFilter};
use crate::search::core::ids::RecipeId;
use crate::search::retrieval::candidates::AttributeHit;
use crate::search::retrieval::stores::{AttributeStore, StoreFuture};

/// Filterable metadata for one stored recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Recipe identifier.
    pub id: RecipeId,
    /// Display title.
    pub title: String,
    /// Cuisine name, normalized lowercase.
    pub cuisine: Option<String>,
    /// Difficulty level.
    pub difficulty: Option<Difficulty>,
    /// Preparation plus cook time.
    pub total_time_minutes: Option<u32>,
    /// Diets the recipe satisfies.
    pub diet_tags: Vec<DietType>,
    /// Ingredient names, normalized lowercase.
    pub ingredients: Vec<String>,
}

impl RecipeRecord {
    /// Whether one predicate is satisfied by this record. Missing metadata
    /// never satisfies a predicate.
    #[must_use]
    pub fn matches(&self, filter: &RecipeFilter) -> bool {
        match filter {
            RecipeFilter::Cuisine(name) => {
                self.cuisine.as_deref() == Some(name.as_str())
            }
            RecipeFilter::Diet(diet) => self.diet_tags.contains(diet),
            RecipeFilter::MaxTotalTimeMinutes(max) => self
                .total_time_minutes
                .is_some_and(|minutes| minutes <= *max),
            RecipeFilter::Difficulty(level) => self.difficulty == Some(*level),
            RecipeFilter::Ingredient(name) => {
                self.ingredients.iter().any(|i| i == name)
            }
        }
    }

    /// Score this record against a predicate set.
    ///
    /// Returns `None` when no predicate matches at all; such rows are not
    /// candidates.
    #[must_use]
    pub fn score(&self, filters: &FilterSet) -> Option<AttributeHit> {
        if filters.is_empty() {
            return None;
        }

        let total = filters.len();
        let matched = filters.iter().filter(|f| self.matches(f)).count();
        if matched == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let match_ratio = matched as f64 / total as f64;

        let queried = filters.ingredient_names();
        let ingredient_ratio = if queried.is_empty() {
            None
        } else {
            let present = queried
                .iter()
                .filter(|name| self.ingredients.iter().any(|i| i == *name))
                .count();
            #[allow(clippy::cast_precision_loss)]
            Some(present as f64 / queried.len() as f64)
        };

        let diet_compliant = filters
            .diet_types()
            .iter()
            .all(|diet| self.diet_tags.contains(diet));

        Some(AttributeHit {
            recipe_id: self.id,
            match_ratio,
            ingredient_ratio,
            diet_compliant,
        })
    }
}

/// Recipe attribute rows in a plain `SQLite` table.
pub struct SqliteRecipeAttributeStore {
    conn: Connection,
    table: String,
}

impl SqliteRecipeAttributeStore {
    /// Open the database and create the recipes table if missing.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> SearchResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        let table = config.recipes_table.clone();

        let ddl_table = table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {ddl_table} (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    cuisine TEXT,
                    difficulty TEXT,
                    total_time_minutes INTEGER,
                    diet_tags TEXT NOT NULL,
                    ingredients TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{ddl_table}_cuisine
                    ON {ddl_table}(cuisine);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    /// Insert or replace a recipe's attribute row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be written.
    pub async fn upsert(&self, record: &RecipeRecord) -> SearchResult<()> {
        let table = self.table.clone();
        let recipe_id = record.id;
        let record = record.clone();
        let diet_tags = serde_json::to_string(&record.diet_tags)?;
        let ingredients = serde_json::to_string(&record.ingredients)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT OR REPLACE INTO {table}
                         (id, title, cuisine, difficulty, total_time_minutes, diet_tags, ingredients)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                    ),
                    rusqlite::params![
                        record.id,
                        record.title,
                        record.cuisine,
                        record.difficulty.map(|d| d.to_string()),
                        record.total_time_minutes,
                        diet_tags,
                        ingredients,
                    ],
                )?;
                Ok(())
            })
            .await?;
        debug!(%recipe_id, "upserted recipe attributes");
        Ok(())
    }

    /// Delete a recipe's attribute row, returning whether a row was removed.
    ///
    /// # Errors
    /// Returns an error if the delete cannot be executed.
    pub async fn delete(&self, recipe_id: RecipeId) -> SearchResult<bool> {
        let table = self.table.clone();
        let deleted = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    &format!("DELETE FROM {table} WHERE id = ?1"),
                    rusqlite::params![recipe_id],
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// SQL disjunction over the predicate kinds stored as plain columns.
    ///
    /// Returns `None` (full scan) when the set contains a diet or ingredient
    /// predicate: those match against JSON columns and a row may qualify on
    /// them alone, so no column clause can exclude rows safely.
    fn prefilter(filters: &FilterSet) -> Option<(String, Vec<SqlValue>)> {
        let mut clauses = Vec::with_capacity(filters.len());
        let mut params = Vec::with_capacity(filters.len());
        for filter in filters.iter() {
            match filter {
                RecipeFilter::Cuisine(name) => {
                    params.push(SqlValue::Text(name.clone()));
                    clauses.push("cuisine = ?");
                }
                RecipeFilter::Difficulty(level) => {
                    params.push(SqlValue::Text(level.to_string()));
                    clauses.push("difficulty = ?");
                }
                RecipeFilter::MaxTotalTimeMinutes(max) => {
                    params.push(SqlValue::Integer(i64::from(*max)));
                    clauses.push("total_time_minutes <= ?");
                }
                RecipeFilter::Diet(_) | RecipeFilter::Ingredient(_) => return None,
            }
        }
        if clauses.is_empty() {
            return None;
        }
        Some((clauses.join(" OR "), params))
    }

    async fn load_candidates(&self, filters: &FilterSet) -> SearchResult<Vec<RecipeRecord>> {
        let table = self.table.clone();
        let prefilter = Self::prefilter(filters);
        let rows = self
            .conn
            .call(move |conn| {
                let mut sql = format!(
                    "SELECT id, title, cuisine, difficulty, total_time_minutes,
                            diet_tags, ingredients
                     FROM {table}"
                );
                let params = match prefilter {
                    Some((clause, params)) => {
                        sql.push_str(" WHERE ");
                        sql.push_str(&clause);
                        params
                    }
                    None => Vec::new(),
                };
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params), |row| {
                        Ok((
                            row.get::<_, RecipeId>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<u32>>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, title, cuisine, difficulty, total_time_minutes, diet_tags, ingredients) in rows
        {
            let difficulty = match difficulty {
                Some(raw) => Some(Difficulty::parse(&raw)?),
                None => None,
            };
            records.push(RecipeRecord {
                id,
                title,
                cuisine,
                difficulty,
                total_time_minutes,
                diet_tags: serde_json::from_str(&diet_tags)?,
                ingredients: serde_json::from_str(&ingredients)?,
            });
        }
        Ok(records)
    }
}

impl AttributeStore for SqliteRecipeAttributeStore {
    fn query(
        &self,
        filters: &FilterSet,
        k: usize,
    ) -> StoreFuture<'_, SearchResult<Vec<AttributeHit>>> {
        let filters = filters.clone();
        Box::pin(async move {
            if filters.is_empty() {
                return Ok(Vec::new());
            }
            let records = self.load_candidates(&filters).await?;
            let mut hits: Vec<AttributeHit> = records
                .iter()
                .filter_map(|record| record.score(&filters))
                .collect();
            hits.sort_by(|a, b| {
                b.match_ratio
                    .total_cmp(&a.match_ratio)
                    .then_with(|| a.recipe_id.cmp(&b.recipe_id))
            });
            hits.truncate(k);
            Ok(hits)
        })
    }
}
