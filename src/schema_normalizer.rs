use crate::error::{Error, Result};
use crate::reporter::Reporter;
use crate::schema_adapter::SchemaSource;
use indexmap::IndexMap;
use log::debug;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// The `type` keyword: a single type name or a list of them
/// (`["string", "null"]` is the 3.1 way to say nullable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl SchemaType {
    /// The type name, when exactly one is given
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SchemaType::Single(name) => Some(name),
            SchemaType::Union(_) => None,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            SchemaType::Single(name) => vec![name.as_str()],
            SchemaType::Union(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for SchemaType {
    fn from(name: &str) -> Self {
        SchemaType::Single(name.to_string())
    }
}

/// Library-agnostic schema description produced by the normalizer.
///
/// Properties keep the insertion order of the source schema. Keys that are not
/// structural (`description`, `example`, ...) live in `metadata` and are
/// serialized inline. Boolean subschemas are read as their object forms:
/// `true` becomes `{}` and `false` becomes `{"not": {}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSchema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    /// Format for primitive types (e.g., "int32", "date-time")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Properties for object types
    #[serde(
        default,
        deserialize_with = "subschema_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub properties: IndexMap<String, CanonicalSchema>,
    /// Required field names for object types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Items schema for array types
    #[serde(
        default,
        deserialize_with = "optional_subschema",
        skip_serializing_if = "Option::is_none"
    )]
    pub items: Option<Box<CanonicalSchema>>,
    /// Allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Value>,
    /// Everything else (description, example, nullable, ...)
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl CanonicalSchema {
    /// Schema with only a `type`
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// The single type name, if the schema declares exactly one
    pub fn type_name(&self) -> Option<&str> {
        self.schema_type.as_ref().and_then(SchemaType::as_str)
    }

    /// Read one subschema, accepting the boolean forms
    pub fn from_subschema(value: Value) -> serde_json::Result<Self> {
        match value {
            Value::Bool(true) => Ok(Self::default()),
            Value::Bool(false) => {
                let mut schema = Self::default();
                schema.metadata.insert("not".to_string(), json!({}));
                Ok(schema)
            }
            other => serde_json::from_value(other),
        }
    }

    /// True for the `{}` schema
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge extension metadata over this schema.
    ///
    /// Metadata is applied after structural conversion, so a metadata key that
    /// names a structural field (`type`, `format`, ...) replaces it.
    pub fn apply_metadata(&mut self, metadata: &Map<String, Value>) -> Result<()> {
        if metadata.is_empty() {
            return Ok(());
        }
        let mut value = serde_json::to_value(&*self)?;
        if let Value::Object(map) = &mut value {
            for (key, meta) in metadata {
                map.insert(key.clone(), meta.clone());
            }
        }
        *self = serde_json::from_value(value)?;
        Ok(())
    }
}

fn subschema_map<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, CanonicalSchema>, D::Error>
where
    D: Deserializer<'de>,
{
    IndexMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(name, value)| {
            CanonicalSchema::from_subschema(value)
                .map(|schema| (name, schema))
                .map_err(de::Error::custom)
        })
        .collect()
}

fn optional_subschema<'de, D>(deserializer: D) -> std::result::Result<Option<Box<CanonicalSchema>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)?
        .map(|value| CanonicalSchema::from_subschema(value).map(Box::new))
        .transpose()
        .map_err(de::Error::custom)
}

/// Where a schema appears in an operation; used to label conversion warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaRole {
    InputParams,
    InputQuery,
    InputBody,
    OutputBody,
}

impl SchemaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaRole::InputParams => "input-params",
            SchemaRole::InputQuery => "input-query",
            SchemaRole::InputBody => "input-body",
            SchemaRole::OutputBody => "output-body",
        }
    }
}

impl fmt::Display for SchemaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the schema being converted
#[derive(Debug, Clone, Copy)]
pub struct SchemaContext<'a> {
    pub operation_id: &'a str,
    pub role: SchemaRole,
}

/// Converts schema sources into canonical schemas, reporting failures instead
/// of propagating them.
pub struct SchemaNormalizer<'r> {
    reporter: &'r dyn Reporter,
}

impl<'r> SchemaNormalizer<'r> {
    pub fn new(reporter: &'r dyn Reporter) -> Self {
        Self { reporter }
    }

    /// Normalize a schema source.
    ///
    /// Never fails: a source that cannot be converted yields an empty schema
    /// and exactly one warning on the reporter.
    pub fn normalize(&self, schema: &SchemaSource, context: SchemaContext<'_>) -> CanonicalSchema {
        match try_normalize(schema, context) {
            Ok(canonical) => canonical,
            Err(error) => {
                self.reporter.report(error);
                CanonicalSchema::default()
            }
        }
    }
}

/// Normalize a schema source, returning `UnsupportedSchemaKind` on failure.
pub fn try_normalize(schema: &SchemaSource, context: SchemaContext<'_>) -> Result<CanonicalSchema> {
    let unsupported = |reason: String| Error::UnsupportedSchemaKind {
        operation_id: context.operation_id.to_string(),
        role: context.role,
        reason,
    };

    let adapter = match schema {
        SchemaSource::Adapter(adapter) => adapter,
        SchemaSource::Opaque(_) => {
            return Err(unsupported("opaque schema has no introspectable shape".to_string()))
        }
    };

    debug!(
        "Normalizing {} schema ({}) for operation {}",
        adapter.kind(),
        context.role,
        context.operation_id
    );

    let shape = adapter
        .introspect_shape()
        .ok_or_else(|| unsupported(format!("{} schema is not an object schema", adapter.kind())))?;

    let mut canonical = adapter
        .to_canonical()
        .map_err(|e| unsupported(e.to_string()))?;

    for field in &shape {
        let Some(metadata) = adapter.field_metadata(field) else {
            continue;
        };
        canonical
            .properties
            .entry(field.clone())
            .or_default()
            .apply_metadata(&metadata)
            .map_err(|e| unsupported(format!("metadata for field {}: {}", field, e)))?;
    }

    Ok(canonical)
}
