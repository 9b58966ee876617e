use std::cmp::Ordering;

use unaccent::unaccent;

use crate::library::{Entity, FieldRef};

use super::{SortOrder, SortSpec};

/// Sorts entities by one field without mutating the input.
///
/// Entities whose sort field is undefined always come first, whatever the
/// direction; only the block of defined values is reversed for `DESC`. The
/// defined block is sorted stably in ascending order and then reversed, so
/// ties keep their input order under `ASC` and appear reversed under `DESC`.
/// With `include_undefined == false` the undefined entities are dropped.
pub fn apply_sort<'a>(
    entities: &[&'a Entity],
    sort: &SortSpec,
    include_undefined: bool,
) -> Vec<&'a Entity> {
    let mut undefined = Vec::new();
    let mut defined = Vec::new();

    for entity in entities.iter().copied() {
        match sort_key(entity, sort.field()) {
            Some(key) => defined.push((key, entity)),
            None if include_undefined => undefined.push(entity),
            None => {}
        }
    }

    // `sort_by` is a stable merge sort
    defined.sort_by(|(a, _), (b, _)| a.compare(b));
    if sort.order() == SortOrder::Desc {
        defined.reverse();
    }

    undefined
        .into_iter()
        .chain(defined.into_iter().map(|(_, entity)| entity))
        .collect()
}

enum SortKey<'a> {
    Number(f64),
    Text { folded: String, raw: &'a str },
}

impl SortKey<'_> {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (
                SortKey::Text { folded: a, raw: raw_a },
                SortKey::Text { folded: b, raw: raw_b },
            ) => a.cmp(b).then_with(|| raw_a.cmp(raw_b)),
            (SortKey::Number(_), SortKey::Text { .. }) => Ordering::Less,
            (SortKey::Text { .. }, SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

fn sort_key<'a>(entity: &'a Entity, field: &str) -> Option<SortKey<'a>> {
    match entity.field(field)? {
        FieldRef::Number(value) => value.map(SortKey::Number),
        FieldRef::Text(text) => Some(SortKey::Text {
            folded: fold_text(text),
            raw: text,
        }),
        FieldRef::TextList(_) => None,
    }
}

/// Accent- and case-insensitive collation key, so "Émile" sorts with "emile".
fn fold_text(text: &str) -> String {
    unaccent(text).to_lowercase()
}
