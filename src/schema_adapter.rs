//! Schema sources and the adapters that describe them.
//!
//! Every supported schema library is represented by a [`SchemaAdapter`]
//! implementation. Values no adapter understands are carried as
//! [`SchemaSource::Opaque`] and fail normalization with a warning.
//!
//! Two adapters ship with the crate:
//!
//! - [`ObjectSchema`]: object schemas built in Rust with [`FieldSchema`] fields
//! - [`JsonSchemaAdapter`]: literal JSON Schema objects, as found in route manifests

use crate::error::{Error, Result};
use crate::schema_normalizer::CanonicalSchema;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Capabilities every schema library adapter provides.
pub trait SchemaAdapter: fmt::Debug + Send + Sync {
    /// Short name used in log and warning messages
    fn kind(&self) -> &'static str;

    /// Ordered field names, or `None` when the schema is not an object schema
    fn introspect_shape(&self) -> Option<Vec<String>>;

    /// Extension metadata attached to one field
    fn field_metadata(&self, field: &str) -> Option<Map<String, Value>>;

    /// Structural conversion to the canonical form
    fn to_canonical(&self) -> Result<CanonicalSchema>;

    /// Check a value against the schema
    fn validate(&self, value: &Value) -> Validation;
}

/// A schema as declared by an endpoint. The compiler only borrows it.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    Adapter(Arc<dyn SchemaAdapter>),
    Opaque(Value),
}

impl SchemaSource {
    pub fn adapter(adapter: impl SchemaAdapter + 'static) -> Self {
        SchemaSource::Adapter(Arc::new(adapter))
    }

    /// Wrap a JSON value: object JSON Schemas get the JSON Schema adapter,
    /// anything else is opaque.
    pub fn from_json(value: Value) -> Self {
        if JsonSchemaAdapter::accepts(&value) {
            SchemaSource::adapter(JsonSchemaAdapter { schema: value })
        } else {
            SchemaSource::Opaque(value)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SchemaSource::Adapter(adapter) => adapter.kind(),
            SchemaSource::Opaque(_) => "opaque",
        }
    }
}

impl From<ObjectSchema> for SchemaSource {
    fn from(schema: ObjectSchema) -> Self {
        SchemaSource::adapter(schema)
    }
}

impl<'de> Deserialize<'de> for SchemaSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(SchemaSource::from_json)
    }
}

/// Outcome of validating a value against a schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    /// The accepted value, when valid
    pub data: Option<Value>,
}

impl Validation {
    fn from_issues(errors: Vec<ValidationIssue>, data: Value) -> Self {
        let valid = errors.is_empty();
        Self {
            valid,
            errors,
            data: valid.then_some(data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: &[String], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }
}

/// Validate `value` against `schema`.
///
/// Opaque sources are a usage error, not a data condition.
pub fn validate_schema(schema: &SchemaSource, value: &Value) -> Result<Validation> {
    match schema {
        SchemaSource::Adapter(adapter) => Ok(adapter.validate(value)),
        SchemaSource::Opaque(raw) => Err(Error::InvalidSchemaUsage(format!(
            "cannot validate against {}",
            raw
        ))),
    }
}

/// Field names of an object schema
pub fn schema_keys(schema: &SchemaSource) -> Result<Vec<String>> {
    let shape = match schema {
        SchemaSource::Adapter(adapter) => adapter.introspect_shape(),
        SchemaSource::Opaque(_) => None,
    };
    shape.ok_or_else(|| {
        Error::InvalidSchemaUsage(format!("{} schema has no fields", schema.kind()))
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Kind of value a field accepts
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldSchema>),
    Object(ObjectSchema),
    Enum(Vec<String>),
    Any,
}

/// One field of an [`ObjectSchema`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    kind: FieldKind,
    optional: bool,
    description: Option<String>,
    openapi: Option<Map<String, Value>>,
}

impl FieldSchema {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            optional: false,
            description: None,
            openapi: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn array(items: FieldSchema) -> Self {
        Self::new(FieldKind::Array(Box::new(items)))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::new(FieldKind::Object(schema))
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FieldKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach OpenAPI extension metadata (`example`, `description`, ...).
    /// Non-object values are ignored.
    pub fn openapi(mut self, metadata: Value) -> Self {
        if let Value::Object(map) = metadata {
            self.openapi = Some(map);
        }
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Structural schema plus description; extension metadata is left to the caller
    fn canonical(&self) -> Result<CanonicalSchema> {
        let mut schema = match &self.kind {
            FieldKind::String => CanonicalSchema::typed("string"),
            FieldKind::Integer => CanonicalSchema::typed("integer"),
            FieldKind::Number => CanonicalSchema::typed("number"),
            FieldKind::Boolean => CanonicalSchema::typed("boolean"),
            FieldKind::Array(items) => CanonicalSchema {
                items: Some(Box::new(items.canonical_with_metadata()?)),
                ..CanonicalSchema::typed("array")
            },
            FieldKind::Object(object) => object.canonical_with_metadata()?,
            FieldKind::Enum(values) => CanonicalSchema {
                enum_values: Some(values.iter().cloned().map(Value::String).collect()),
                ..CanonicalSchema::typed("string")
            },
            FieldKind::Any => CanonicalSchema::default(),
        };
        if let Some(description) = &self.description {
            schema
                .metadata
                .insert("description".to_string(), Value::String(description.clone()));
        }
        Ok(schema)
    }

    fn canonical_with_metadata(&self) -> Result<CanonicalSchema> {
        let mut schema = self.canonical()?;
        if let Some(metadata) = &self.openapi {
            schema.apply_metadata(metadata)?;
        }
        Ok(schema)
    }

    fn check(&self, value: &Value, path: &mut Vec<String>, issues: &mut Vec<ValidationIssue>) -> Value {
        let expected = match &self.kind {
            FieldKind::String if value.is_string() => return value.clone(),
            FieldKind::String => "string",
            FieldKind::Integer if matches!(json_type_name(value), "integer") => return value.clone(),
            FieldKind::Integer => "integer",
            FieldKind::Number if value.is_number() => return value.clone(),
            FieldKind::Number => "number",
            FieldKind::Boolean if value.is_boolean() => return value.clone(),
            FieldKind::Boolean => "boolean",
            FieldKind::Any => return value.clone(),
            FieldKind::Object(object) => return object.check(value, path, issues),
            FieldKind::Array(items) => {
                let Some(elements) = value.as_array() else {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("Expected array, received {}", json_type_name(value)),
                    ));
                    return value.clone();
                };
                let mut checked = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    path.push(index.to_string());
                    checked.push(items.check(element, path, issues));
                    path.pop();
                }
                return Value::Array(checked);
            }
            FieldKind::Enum(values) => {
                match value.as_str() {
                    Some(s) if values.iter().any(|v| v == s) => {}
                    _ => issues.push(ValidationIssue::new(
                        path,
                        format!("Expected one of [{}]", values.join(", ")),
                    )),
                }
                return value.clone();
            }
        };
        issues.push(ValidationIssue::new(
            path,
            format!("Expected {}, received {}", expected, json_type_name(value)),
        ));
        value.clone()
    }
}

/// Object schema with ordered, introspectable fields.
///
/// ```
/// use openapi_from_handlers::schema_adapter::{FieldSchema, ObjectSchema};
/// use serde_json::json;
///
/// let todo = ObjectSchema::new()
///     .field("id", FieldSchema::integer())
///     .field("name", FieldSchema::string().openapi(json!({ "example": "Buy milk" })))
///     .field("completed", FieldSchema::boolean().optional());
/// assert_eq!(todo.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: IndexMap<String, FieldSchema>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field; redeclaring a name replaces it in place
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn structural(&self) -> Result<CanonicalSchema> {
        let mut schema = CanonicalSchema::typed("object");
        for (name, field) in &self.fields {
            schema.properties.insert(name.clone(), field.canonical()?);
            if !field.optional {
                schema.required.push(name.clone());
            }
        }
        schema.additional_properties = Some(Value::Bool(false));
        Ok(schema)
    }

    fn canonical_with_metadata(&self) -> Result<CanonicalSchema> {
        let mut schema = self.structural()?;
        for (name, field) in &self.fields {
            if let (Some(metadata), Some(property)) =
                (&field.openapi, schema.properties.get_mut(name))
            {
                property.apply_metadata(metadata)?;
            }
        }
        Ok(schema)
    }

    fn check(&self, value: &Value, path: &mut Vec<String>, issues: &mut Vec<ValidationIssue>) -> Value {
        let Some(object) = value.as_object() else {
            issues.push(ValidationIssue::new(
                path,
                format!("Expected object, received {}", json_type_name(value)),
            ));
            return value.clone();
        };

        // Undeclared keys are stripped from the accepted data.
        let mut data = Map::new();
        for (name, field) in &self.fields {
            path.push(name.clone());
            match object.get(name) {
                Some(field_value) => {
                    data.insert(name.clone(), field.check(field_value, path, issues));
                }
                None if field.optional => {}
                None => issues.push(ValidationIssue::new(path, "Required")),
            }
            path.pop();
        }
        Value::Object(data)
    }
}

impl SchemaAdapter for ObjectSchema {
    fn kind(&self) -> &'static str {
        "object"
    }

    fn introspect_shape(&self) -> Option<Vec<String>> {
        Some(self.fields.keys().cloned().collect())
    }

    fn field_metadata(&self, field: &str) -> Option<Map<String, Value>> {
        self.fields.get(field).and_then(|f| f.openapi.clone())
    }

    fn to_canonical(&self) -> Result<CanonicalSchema> {
        self.structural()
    }

    fn validate(&self, value: &Value) -> Validation {
        let mut issues = Vec::new();
        let data = self.check(value, &mut Vec::new(), &mut issues);
        Validation::from_issues(issues, data)
    }
}

/// Literal JSON Schema object with `properties`.
///
/// A property's `openapi` object is its extension metadata: it is removed from
/// the structural output and merged back over the property.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchemaAdapter {
    schema: Value,
}

/// Key holding per-property extension metadata in literal JSON Schemas
const METADATA_KEY: &str = "openapi";

impl JsonSchemaAdapter {
    /// Whether `value` looks like an object JSON Schema
    pub fn accepts(value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        let is_object_type = match object.get("type") {
            None => true,
            Some(t) => t == "object",
        };
        is_object_type && object.get("properties").is_some_and(Value::is_object)
    }

    pub fn new(schema: Value) -> Result<Self> {
        if Self::accepts(&schema) {
            Ok(Self { schema })
        } else {
            Err(Error::InvalidSchemaUsage(
                "JSON Schema must be an object schema with properties".to_string(),
            ))
        }
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.schema.get("properties").and_then(Value::as_object)
    }

    fn fold_metadata(schema: &mut Value) {
        if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
            for property in properties.values_mut() {
                Self::fold_metadata(property);
                if let Some(object) = property.as_object_mut() {
                    if let Some(Value::Object(metadata)) = object.shift_remove(METADATA_KEY) {
                        object.extend(metadata);
                    }
                }
            }
        }
        if let Some(items) = schema.get_mut("items") {
            Self::fold_metadata(items);
        }
    }
}

impl SchemaAdapter for JsonSchemaAdapter {
    fn kind(&self) -> &'static str {
        "json-schema"
    }

    fn introspect_shape(&self) -> Option<Vec<String>> {
        self.properties().map(|p| p.keys().cloned().collect())
    }

    fn field_metadata(&self, field: &str) -> Option<Map<String, Value>> {
        self.properties()?
            .get(field)?
            .get(METADATA_KEY)?
            .as_object()
            .cloned()
    }

    fn to_canonical(&self) -> Result<CanonicalSchema> {
        let mut schema = self.schema.clone();
        Self::fold_metadata(&mut schema);
        let mut canonical: CanonicalSchema = serde_json::from_value(schema)?;
        if canonical.schema_type.is_none() {
            canonical.schema_type = Some("object".into());
        }
        Ok(canonical)
    }

    fn validate(&self, value: &Value) -> Validation {
        let mut issues = Vec::new();
        let Some(object) = value.as_object() else {
            issues.push(ValidationIssue::new(
                &[],
                format!("Expected object, received {}", json_type_name(value)),
            ));
            return Validation::from_issues(issues, value.clone());
        };

        let required = self
            .schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default();
        for name in required {
            if !object.contains_key(name) {
                issues.push(ValidationIssue::new(&[name.to_string()], "Required"));
            }
        }

        if let Some(properties) = self.properties() {
            for (name, property) in properties {
                let Some(field_value) = object.get(name) else {
                    continue;
                };
                let expected: Vec<&str> = match property.get("type") {
                    Some(Value::String(single)) => vec![single.as_str()],
                    Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
                    _ => continue,
                };
                let actual = json_type_name(field_value);
                let matches = expected
                    .iter()
                    .any(|t| *t == actual || (*t == "number" && actual == "integer"));
                if !matches {
                    issues.push(ValidationIssue::new(
                        &[name.clone()],
                        format!("Expected {}, received {}", expected.join(" | "), actual),
                    ));
                }
            }
        }

        Validation::from_issues(issues, value.clone())
    }
}
