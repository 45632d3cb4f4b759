//! Structured filter predicates for recipe search.
//!
//! Filters are a closed, tagged set of variants validated once at
//! construction; there is no string-keyed dictionary applied at runtime.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::core::errors::{SearchError, SearchResult};

/// Dietary restriction categories recognized by the pipeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    /// No meat or fish.
    Vegetarian,
    /// No animal products.
    Vegan,
    /// No gluten-containing grains.
    GlutenFree,
    /// No dairy products.
    DairyFree,
    /// Low-carbohydrate ketogenic.
    Keto,
    /// Paleolithic diet.
    Paleo,
}

impl DietType {
    /// Parse a diet name in snake or kebab case.
    ///
    /// # Errors
    /// Returns `InvalidFilter` for unrecognized diet names.
    pub fn parse(raw: &str) -> SearchResult<Self> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "vegetarian" => Ok(Self::Vegetarian),
            "vegan" => Ok(Self::Vegan),
            "gluten_free" => Ok(Self::GlutenFree),
            "dairy_free" => Ok(Self::DairyFree),
            "keto" => Ok(Self::Keto),
            "paleo" => Ok(Self::Paleo),
            other => Err(SearchError::InvalidFilter(format!(
                "unknown diet type: {other}"
            ))),
        }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GlutenFree => "gluten_free",
            Self::DairyFree => "dairy_free",
            Self::Keto => "keto",
            Self::Paleo => "paleo",
        };
        f.write_str(name)
    }
}

/// Recipe difficulty levels.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Beginner-friendly.
    Easy,
    /// Some technique required.
    Medium,
    /// Advanced technique or timing.
    Hard,
}

impl Difficulty {
    /// Parse a difficulty name.
    ///
    /// # Errors
    /// Returns `InvalidFilter` for unrecognized difficulty names.
    pub fn parse(raw: &str) -> SearchResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(SearchError::InvalidFilter(format!(
                "unknown difficulty: {other}"
            ))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// A single filter predicate over a filterable recipe attribute.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeFilter {
    /// Cuisine name match (normalized lowercase).
    Cuisine(String),
    /// Dietary restriction the recipe must satisfy.
    Diet(DietType),
    /// Upper bound on total preparation + cook time.
    MaxTotalTimeMinutes(u32),
    /// Difficulty level match.
    Difficulty(Difficulty),
    /// Ingredient the recipe must contain (normalized lowercase).
    Ingredient(String),
}

impl fmt::Display for RecipeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuisine(name) => write!(f, "cuisine={name}"),
            Self::Diet(diet) => write!(f, "diet={diet}"),
            Self::MaxTotalTimeMinutes(minutes) => write!(f, "max_total_time={minutes}"),
            Self::Difficulty(level) => write!(f, "difficulty={level}"),
            Self::Ingredient(name) => write!(f, "ingredient={name}"),
        }
    }
}

/// A deduplicated, canonically ordered set of filter predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    filters: BTreeSet<RecipeFilter>,
}

impl FilterSet {
    /// Create an empty filter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters: BTreeSet::new(),
        }
    }

    /// Build a filter set from predicates, normalizing text values.
    #[must_use]
    pub fn from_filters(filters: impl IntoIterator<Item = RecipeFilter>) -> Self {
        let mut set = Self::new();
        for filter in filters {
            set.insert(filter);
        }
        set
    }

    /// Insert a predicate, normalizing text values.
    pub fn insert(&mut self, filter: RecipeFilter) {
        let normalized = match filter {
            RecipeFilter::Cuisine(name) => {
                RecipeFilter::Cuisine(name.trim().to_lowercase())
            }
            RecipeFilter::Ingredient(name) => {
                RecipeFilter::Ingredient(name.trim().to_lowercase())
            }
            other => other,
        };
        self.filters.insert(normalized);
    }

    /// Parse a loose JSON map of caller-supplied filters into typed predicates.
    ///
    /// Accepted keys: `cuisine`, `diet` (string or array), `difficulty`,
    /// `max_total_time_minutes`, `ingredients` (string or array).
    ///
    /// # Errors
    /// Returns `InvalidFilter` on unknown keys or mistyped values.
    pub fn from_json_map(map: &serde_json::Map<String, Value>) -> SearchResult<Self> {
        let mut set = Self::new();
        for (key, value) in map {
            match key.as_str() {
                "cuisine" => {
                    let name = expect_string(key, value)?;
                    set.insert(RecipeFilter::Cuisine(name));
                }
                "diet" | "diet_types" => {
                    for raw in expect_string_list(key, value)? {
                        set.insert(RecipeFilter::Diet(DietType::parse(&raw)?));
                    }
                }
                "difficulty" => {
                    let raw = expect_string(key, value)?;
                    set.insert(RecipeFilter::Difficulty(Difficulty::parse(&raw)?));
                }
                "max_total_time_minutes" => {
                    let minutes = value.as_u64().ok_or_else(|| {
                        SearchError::InvalidFilter(format!(
                            "filter {key} must be a non-negative integer"
                        ))
                    })?;
                    let minutes = u32::try_from(minutes).map_err(|_| {
                        SearchError::InvalidFilter(format!("filter {key} is out of range"))
                    })?;
                    set.insert(RecipeFilter::MaxTotalTimeMinutes(minutes));
                }
                "ingredients" => {
                    for raw in expect_string_list(key, value)? {
                        set.insert(RecipeFilter::Ingredient(raw));
                    }
                }
                other => {
                    return Err(SearchError::InvalidFilter(format!(
                        "unknown filter key: {other}"
                    )));
                }
            }
        }
        Ok(set)
    }

    /// Merge another filter set into this one.
    pub fn merge(&mut self, other: &Self) {
        for filter in &other.filters {
            self.filters.insert(filter.clone());
        }
    }

    /// Whether the set contains no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of predicates in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Iterate over predicates in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &RecipeFilter> {
        self.filters.iter()
    }

    /// Diet predicates in the set.
    #[must_use]
    pub fn diet_types(&self) -> Vec<DietType> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                RecipeFilter::Diet(diet) => Some(*diet),
                _ => None,
            })
            .collect()
    }

    /// Ingredient names requested by the set.
    #[must_use]
    pub fn ingredient_names(&self) -> Vec<String> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                RecipeFilter::Ingredient(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether the set carries at least one ingredient predicate.
    #[must_use]
    pub fn has_ingredient_query(&self) -> bool {
        self.filters
            .iter()
            .any(|f| matches!(f, RecipeFilter::Ingredient(_)))
    }

    /// Canonical string form, stable across identical sets. Used in cache keys.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let parts: Vec<String> = self.filters.iter().map(ToString::to_string).collect();
        parts.join("&")
    }
}

impl FromIterator<RecipeFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = RecipeFilter>>(iter: I) -> Self {
        Self::from_filters(iter)
    }
}

fn expect_string(key: &str, value: &Value) -> SearchResult<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        SearchError::InvalidFilter(format!("filter {key} must be a string"))
    })
}

fn expect_string_list(key: &str, value: &Value) -> SearchResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| expect_string(key, item))
            .collect(),
        _ => Err(SearchError::InvalidFilter(format!(
            "filter {key} must be a string or an array of strings"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_normalizes_and_dedupes() {
        let mut set = FilterSet::new();
        set.insert(RecipeFilter::Cuisine("  Italian ".to_string()));
        set.insert(RecipeFilter::Cuisine("italian".to_string()));
        set.insert(RecipeFilter::Ingredient("Basil".to_string()));
        assert_eq!(set.len(), 2);
        assert_eq!(set.ingredient_names(), vec!["basil".to_string()]);
    }

    #[test]
    fn test_canonical_string_is_order_independent() {
        let a = FilterSet::from_filters(vec![
            RecipeFilter::Ingredient("tomato".to_string()),
            RecipeFilter::Diet(DietType::Vegan),
        ]);
        let b = FilterSet::from_filters(vec![
            RecipeFilter::Diet(DietType::Vegan),
            RecipeFilter::Ingredient("tomato".to_string()),
        ]);
        assert_eq!(a.canonical_string(), b.canonical_string());
    }

    #[test]
    fn test_from_json_map_accepts_known_keys() {
        let map = serde_json::json!({
            "cuisine": "thai",
            "diet": ["vegan", "gluten-free"],
            "max_total_time_minutes": 30,
            "ingredients": "lemongrass"
        });
        let Value::Object(map) = map else {
            panic!("expected object")
        };
        let set = FilterSet::from_json_map(&map).expect("valid map");
        assert_eq!(set.len(), 5);
        assert_eq!(
            set.diet_types(),
            vec![DietType::Vegan, DietType::GlutenFree]
        );
    }

    #[test]
    fn test_from_json_map_rejects_unknown_keys() {
        let map = serde_json::json!({ "spiciness": "high" });
        let Value::Object(map) = map else {
            panic!("expected object")
        };
        let err = FilterSet::from_json_map(&map).expect_err("unknown key");
        assert!(matches!(err, SearchError::InvalidFilter(_)));
    }

    #[test]
    fn test_from_json_map_rejects_mistyped_values() {
        let map = serde_json::json!({ "max_total_time_minutes": "thirty" });
        let Value::Object(map) = map else {
            panic!("expected object")
        };
        assert!(FilterSet::from_json_map(&map).is_err());
    }
}
