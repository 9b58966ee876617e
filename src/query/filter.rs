use crate::library::{Entity, FieldRef};

use super::{Filter, NumericFilter, TextFilter, TextMatchMode};

/// Keeps the entities that pass every filter group, preserving input order.
///
/// An entity passes when it matches at least one union filter (or there are
/// none), every intersection filter, none of the exclusion filters and every
/// numeric filter. Evaluation never fails: a field missing on an entity just
/// doesn't match.
pub fn apply_filters<'a>(entities: &[&'a Entity], filters: &[Filter]) -> Vec<&'a Entity> {
    let groups = FilterGroups::partition(filters);
    entities
        .iter()
        .copied()
        .filter(|entity| groups.accepts(entity))
        .collect()
}

#[derive(Default)]
struct FilterGroups<'f> {
    union: Vec<&'f TextFilter>,
    intersection: Vec<&'f TextFilter>,
    exclusion: Vec<&'f TextFilter>,
    numeric: Vec<&'f NumericFilter>,
}

impl<'f> FilterGroups<'f> {
    fn partition(filters: &'f [Filter]) -> Self {
        let mut groups = FilterGroups::default();
        for filter in filters {
            match filter {
                Filter::Text(text) => match text.mode {
                    TextMatchMode::Union => groups.union.push(text),
                    TextMatchMode::Intersection => groups.intersection.push(text),
                    TextMatchMode::Exclusion => groups.exclusion.push(text),
                },
                Filter::Numeric(numeric) => groups.numeric.push(numeric),
            }
        }
        groups
    }

    fn accepts(&self, entity: &Entity) -> bool {
        (self.union.is_empty() || self.union.iter().any(|f| text_matches(entity, f)))
            && self.intersection.iter().all(|f| text_matches(entity, f))
            && !self.exclusion.iter().any(|f| text_matches(entity, f))
            && self.numeric.iter().all(|f| numeric_matches(entity, f))
    }
}

fn text_matches(entity: &Entity, filter: &TextFilter) -> bool {
    match entity.field(&filter.field) {
        Some(FieldRef::TextList(values)) => values.iter().any(|v| *v == filter.value),
        Some(FieldRef::Text(value)) => value == filter.value,
        _ => false,
    }
}

fn numeric_matches(entity: &Entity, filter: &NumericFilter) -> bool {
    match entity.field(&filter.field) {
        Some(FieldRef::Number(Some(value))) => filter.min <= value && value <= filter.max,
        Some(FieldRef::Number(None)) | None => filter.include_undefined,
        _ => false,
    }
}
