//! `SQLite` persistence: vec0 embedding index and recipe attribute rows.

pub mod attribute_recipes;
pub mod sqlite_vec_loader;
pub mod vector_recipes;

pub use attribute_recipes::{RecipeRecord, SqliteRecipeAttributeStore};
pub use sqlite_vec_loader::init_sqlite_vec_extension;
pub use vector_recipes::SqliteRecipeVectorStore;
