//! Caching: TTL backend, stable key construction, and the typed result cache.

pub mod backend;
pub mod keys;
pub mod result_cache;

pub use backend::{CacheBackend, CacheFuture, InMemoryCacheBackend};
pub use keys::{embedding_key, recipe_key, search_key};
pub use result_cache::{RecipeEvent, ResultCache};
