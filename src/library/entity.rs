use std::collections::BTreeMap;
use std::fmt;

/// Reserved field name that resolves to the entity's own ID.
pub const ID_FIELD: &str = "id";

/// A single field value on a library entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    TextList(Vec<String>),
    /// `None` is an explicitly undefined number (`null` in the library file).
    Number(Option<f64>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::TextList(_) => FieldKind::TextList,
            FieldValue::Number(_) => FieldKind::Number,
        }
    }
}

/// Borrowed view of a field used while evaluating filters and sorts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Text(&'a str),
    TextList(&'a [String]),
    Number(Option<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextList,
    Number,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::TextList => "text list",
            FieldKind::Number => "number",
        };
        f.write_str(name)
    }
}

/// A library record (a movie, an album or a track) keyed by a stable ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// Ordered track IDs owned by album-like entities.
    pub track_ids: Option<Vec<String>>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            track_ids: None,
        }
    }

    /// Looks up a field, exposing the entity ID as the implicit `id` text field.
    pub fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        if name == ID_FIELD {
            return Some(FieldRef::Text(&self.id));
        }
        self.fields.get(name).map(|value| match value {
            FieldValue::Text(text) => FieldRef::Text(text),
            FieldValue::TextList(list) => FieldRef::TextList(list),
            FieldValue::Number(number) => FieldRef::Number(*number),
        })
    }

    /// Track IDs contributed to a playlist: the owned tracks of an album, or
    /// the entity itself when it carries no track list.
    pub fn playlist_track_ids(&self) -> Vec<String> {
        match &self.track_ids {
            Some(ids) => ids.clone(),
            None => vec![self.id.clone()],
        }
    }
}

#[cfg(test)]
impl Entity {
    pub fn with_text(mut self, field: &str, value: &str) -> Self {
        self.fields
            .insert(field.to_string(), FieldValue::Text(value.to_string()));
        self
    }

    pub fn with_text_list(mut self, field: &str, values: &[&str]) -> Self {
        self.fields.insert(
            field.to_string(),
            FieldValue::TextList(values.iter().map(|v| v.to_string()).collect()),
        );
        self
    }

    pub fn with_number(mut self, field: &str, value: Option<f64>) -> Self {
        self.fields
            .insert(field.to_string(), FieldValue::Number(value));
        self
    }

    pub fn with_tracks(mut self, track_ids: &[&str]) -> Self {
        self.track_ids = Some(track_ids.iter().map(|t| t.to_string()).collect());
        self
    }
}
