pub mod entity;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use serde_json::{Map, Value};

pub use entity::{Entity, FieldKind, FieldRef, FieldValue, ID_FIELD};

/// Key holding an album's ordered track IDs in the library file.
const TRACK_IDS_KEY: &str = "trackIds";

/// Field name -> kind, derived from every entity in the library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: BTreeMap<String, FieldKind>,
}

impl Schema {
    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        if field == ID_FIELD {
            return Some(FieldKind::Text);
        }
        self.fields.get(field).copied()
    }

    fn record(&mut self, entity_id: &str, field: &str, kind: FieldKind) -> Result<()> {
        match self.fields.get(field) {
            Some(existing) if *existing != kind => bail!(
                "Field '{}' is a {} on entity '{}' but a {} elsewhere in the library",
                field,
                kind,
                entity_id,
                existing
            ),
            Some(_) => Ok(()),
            None => {
                self.fields.insert(field.to_string(), kind);
                Ok(())
            }
        }
    }
}

/// Read-only entity library consumed by the query planner.
#[derive(Debug, Clone, Default)]
pub struct Library {
    entities: Vec<Entity>,
    schema: Schema,
}

impl Library {
    /// Builds a library from already-parsed entities, keeping their order.
    pub fn from_entities(entities: Vec<Entity>) -> Result<Self> {
        let mut schema = Schema::default();
        let mut seen = HashSet::new();

        for entity in &entities {
            if !seen.insert(entity.id.as_str()) {
                bail!("Duplicate entity ID '{}' in library", entity.id);
            }
            for (name, value) in &entity.fields {
                if name == ID_FIELD {
                    bail!("Entity '{}' declares the reserved field 'id'", entity.id);
                }
                if *value != FieldValue::Number(None) {
                    schema.record(&entity.id, name, value.kind())?;
                }
            }
        }

        // `null` is undefined for any kind; a field that is only ever null is a number
        for entity in &entities {
            for (name, value) in &entity.fields {
                if *value == FieldValue::Number(None) && schema.kind_of(name).is_none() {
                    schema.record(&entity.id, name, FieldKind::Number)?;
                }
            }
        }

        Ok(Self { entities, schema })
    }

    /// Load a library from a JSON file mapping entity IDs to field objects.
    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("Loading entity library from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read library file: {}", path.display()))?;
        let library = Self::from_json_str(&contents)
            .wrap_err_with(|| format!("Failed to parse library file: {}", path.display()))?;
        log::info!(
            "Loaded {} entities from {}",
            library.len(),
            path.display()
        );
        Ok(library)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let root: Map<String, Value> =
            serde_json::from_str(contents).wrap_err("Library must be a JSON object")?;

        let entities = root
            .into_iter()
            .map(|(id, value)| parse_entity(id, value))
            .collect::<Result<Vec<_>>>()?;

        Self::from_entities(entities)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn parse_entity(id: String, value: Value) -> Result<Entity> {
    let Value::Object(object) = value else {
        bail!("Entity '{}' must be a JSON object", id);
    };

    let mut entity = Entity::new(id);
    for (name, value) in object {
        if name == TRACK_IDS_KEY {
            entity.track_ids = Some(
                string_list(&value)
                    .ok_or_else(|| eyre!("'{}' on '{}' must be a string array", name, entity.id))?,
            );
            continue;
        }

        let field = match value {
            Value::String(text) => FieldValue::Text(text),
            Value::Number(number) => FieldValue::Number(number.as_f64()),
            Value::Null => FieldValue::Number(None),
            Value::Array(_) => FieldValue::TextList(string_list(&value).ok_or_else(|| {
                eyre!("Field '{}' on '{}' must only contain strings", name, entity.id)
            })?),
            other => bail!(
                "Field '{}' on '{}' has unsupported value {}",
                name,
                entity.id,
                other
            ),
        };
        entity.fields.insert(name, field);
    }

    Ok(entity)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
