//! Declarative filter / sort / limit evaluation over the entity library.
//!
//! Filters and sorts are plain data (they come straight out of the config
//! file), evaluated by [`filter::apply_filters`] and [`sort::apply_sort`] and
//! combined per playlist by [`planner::QueryPlanner`].

use serde::{Deserialize, Serialize};

pub mod filter;
pub mod planner;
pub mod sort;

pub use filter::apply_filters;
pub use planner::{QueryPlanner, ValidationError};
pub use sort::apply_sort;

// ============================================================================
// Filters
// ============================================================================

/// How a text filter combines with the other text filters of a spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatchMode {
    /// Entity passes if it matches at least one union filter.
    #[default]
    Union,
    /// Entity must match every intersection filter.
    Intersection,
    /// Entity must match none of the exclusion filters.
    Exclusion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFilter {
    pub field: String,
    pub value: String,
    #[serde(default)]
    pub mode: TextMatchMode,
}

/// Inclusive numeric range; a missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFilter {
    pub field: String,
    #[serde(default = "unbounded_min")]
    pub min: f64,
    #[serde(default = "unbounded_max")]
    pub max: f64,
    #[serde(default)]
    pub include_undefined: bool,
}

fn unbounded_min() -> f64 {
    f64::NEG_INFINITY
}

fn unbounded_max() -> f64 {
    f64::INFINITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    Text(TextFilter),
    Numeric(NumericFilter),
}

impl Filter {
    pub fn text(field: &str, value: &str, mode: TextMatchMode) -> Self {
        Filter::Text(TextFilter {
            field: field.to_string(),
            value: value.to_string(),
            mode,
        })
    }

    pub fn numeric(field: &str, min: f64, max: f64, include_undefined: bool) -> Self {
        Filter::Numeric(NumericFilter {
            field: field.to_string(),
            min,
            max,
            include_undefined,
        })
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Text(filter) => &filter.field,
            Filter::Numeric(filter) => &filter.field,
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

/// `[field, "ASC" | "DESC"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec(pub String, pub SortOrder);

impl SortSpec {
    pub fn new(field: &str, order: SortOrder) -> Self {
        Self(field.to_string(), order)
    }

    pub fn field(&self) -> &str {
        &self.0
    }

    pub fn order(&self) -> SortOrder {
        self.1
    }
}
