use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::filter::parse_date_value;

/// A single data row: field name to JSON value, in source order.
pub type Record = Map<String, Value>;

/// Type tag of a schema field. Selects the operator set a filter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    #[serde(alias = "number")]
    Int,
    Bool,
    Date,
    Array,
}

impl FieldType {
    pub const ALL: [Self; 5] = [
        Self::String,
        Self::Int,
        Self::Bool,
        Self::Date,
        Self::Array,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Array => "array",
        }
    }

    /// Parse a schema type tag. `number` is accepted as an alias of `int`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(Self::String),
            "int" | "number" => Some(Self::Int),
            "bool" => Some(Self::Bool),
            "date" => Some(Self::Date),
            "array" => Some(Self::Array),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat mapping of field name to type, keeping declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.insert(name, field_type);
        self
    }

    /// Insert a field, replacing the type in place if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, field_type: FieldType) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = field_type,
            None => self.fields.push((name, field_type)),
        }
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a schema from a JSON object of `field -> type tag`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| eyre!("Schema must be a JSON object of field -> type"))?;

        let mut schema = Schema::new();
        for (name, tag) in object {
            let tag = tag
                .as_str()
                .ok_or_else(|| eyre!("Schema type for '{}' must be a string", name))?;
            let field_type = FieldType::from_tag(tag).ok_or_else(|| {
                eyre!(
                    "Unknown type '{}' for field '{}'. Expected string, int, bool, date or array",
                    tag,
                    name
                )
            })?;
            schema.insert(name.clone(), field_type);
        }
        Ok(schema)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(n, t)| (n.clone(), Value::String(t.as_str().to_string())))
                .collect(),
        )
    }
}

impl FromIterator<(String, FieldType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, FieldType)>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for (name, field_type) in iter {
            schema.insert(name, field_type);
        }
        schema
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, field_type) in &self.fields {
            map.serialize_entry(name, field_type)?;
        }
        map.end()
    }
}

fn infer_type(value: &Value) -> Option<FieldType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(FieldType::Bool),
        Value::Number(_) => Some(FieldType::Int),
        Value::Array(_) => Some(FieldType::Array),
        // Compact YYYYMMDD strings are left as strings; they are as likely to be codes.
        Value::String(s) if s.contains('-') && parse_date_value(s).is_some() => {
            Some(FieldType::Date)
        }
        Value::String(_) | Value::Object(_) => Some(FieldType::String),
    }
}

/// Infer a flat schema: the first non-null value of each field decides its
/// type. Fields that are only ever null are typed as strings.
pub fn infer(records: &[Record]) -> Schema {
    let mut schema = Schema::new();
    let mut pending: Vec<String> = Vec::new();

    for record in records {
        for (name, value) in record {
            if schema.contains(name) {
                continue;
            }
            match infer_type(value) {
                Some(field_type) => {
                    pending.retain(|p| p != name);
                    schema.insert(name.clone(), field_type);
                }
                None => {
                    if !pending.contains(name) {
                        pending.push(name.clone());
                    }
                }
            }
        }
    }

    for name in pending {
        schema.insert(name, FieldType::String);
    }
    schema
}
