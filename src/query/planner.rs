use std::collections::HashSet;

use crate::library::{Entity, FieldKind, Library, Schema};
use crate::sync::SyncPlaylistSpec;

use super::{Filter, SortSpec, apply_filters, apply_sort};

/// A spec refers to a field the library doesn't have, or uses it in a way
/// its type doesn't support. Raised before any remote call is made.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Field '{field}' is a {found} field but the {usage} needs {expected}")]
    IncompatibleField {
        field: String,
        usage: &'static str,
        expected: &'static str,
        found: FieldKind,
    },

    #[error("Field '{field}' is a text list and cannot be sorted on")]
    UnsortableField { field: String },

    #[error("Numeric filter on '{field}' has min {min} greater than max {max}")]
    InvalidRange { field: String, min: f64, max: f64 },
}

/// Turns a playlist spec into the ordered list of track IDs it should contain.
pub struct QueryPlanner<'a> {
    library: &'a Library,
    default_sort: Option<SortSpec>,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(library: &'a Library) -> Self {
        Self {
            library,
            default_sort: None,
        }
    }

    /// Sort used by specs that don't name one. Without it library order is kept.
    pub fn with_default_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.default_sort = sort;
        self
    }

    /// Validates, filters, sorts, limits and expands a spec into track IDs.
    pub fn resolve_target(&self, spec: &SyncPlaylistSpec) -> Result<Vec<String>, ValidationError> {
        let sort = spec.sort.as_ref().or(self.default_sort.as_ref());
        self.validate(&spec.filters, sort)?;

        let all: Vec<&Entity> = self.library.entities().iter().collect();
        let mut entities = apply_filters(&all, &spec.filters);

        if let Some(sort) = sort {
            entities = apply_sort(&entities, sort, spec.include_undefined_sort_values);
        }

        // A zero limit means no limit
        if let Some(limit) = spec.limit.filter(|&limit| limit > 0) {
            entities.truncate(limit);
        }

        let track_ids = expand_track_ids(&entities);
        log::debug!(
            "Resolved '{}' to {} entities / {} tracks",
            spec.name,
            entities.len(),
            track_ids.len()
        );
        Ok(track_ids)
    }

    fn validate(&self, filters: &[Filter], sort: Option<&SortSpec>) -> Result<(), ValidationError> {
        let schema = self.library.schema();

        for filter in filters {
            let found = field_kind(schema, filter.field())?;
            match filter {
                Filter::Text(_) if found == FieldKind::Number => {
                    return Err(ValidationError::IncompatibleField {
                        field: filter.field().to_string(),
                        usage: "text filter",
                        expected: "a text or text list field",
                        found,
                    });
                }
                Filter::Numeric(_) if found != FieldKind::Number => {
                    return Err(ValidationError::IncompatibleField {
                        field: filter.field().to_string(),
                        usage: "numeric filter",
                        expected: "a number field",
                        found,
                    });
                }
                Filter::Numeric(numeric) if numeric.min > numeric.max => {
                    return Err(ValidationError::InvalidRange {
                        field: numeric.field.clone(),
                        min: numeric.min,
                        max: numeric.max,
                    });
                }
                _ => {}
            }
        }

        if let Some(sort) = sort {
            if field_kind(schema, sort.field())? == FieldKind::TextList {
                return Err(ValidationError::UnsortableField {
                    field: sort.field().to_string(),
                });
            }
        }

        Ok(())
    }
}

fn field_kind(schema: &Schema, field: &str) -> Result<FieldKind, ValidationError> {
    schema
        .kind_of(field)
        .ok_or_else(|| ValidationError::UnknownField {
            field: field.to_string(),
        })
}

/// Concatenates each entity's tracks in order, keeping the first occurrence of
/// a track ID that shows up more than once.
fn expand_track_ids(entities: &[&Entity]) -> Vec<String> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .flat_map(|entity| entity.playlist_track_ids())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
