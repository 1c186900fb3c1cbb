use crate::error::{Error, Result};
use crate::operation_assembler::{assemble, CompiledOperation, OperationMetadata};
use crate::schema_normalizer::SchemaNormalizer;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Route string -> path item, in insertion order
pub type Paths = Map<String, Value>;

/// HTTP methods an endpoint can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// HTTP OPTIONS method
    Options,
    /// HTTP HEAD method
    Head,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Parse a method name, ignoring case. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Key of the operation inside a path item
    pub fn key(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path-level fields, declared once per route outside any method
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PathMeta {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub servers: Option<Vec<Value>>,
    pub parameters: Option<Vec<Value>>,
}

const PATH_FIELDS: [&str; 5] = ["$ref", "summary", "description", "servers", "parameters"];

/// Everything one route declares: path-level fields plus metadata per method.
///
/// Method keys are kept as declared; names outside [`HttpMethod`] are ignored
/// when the route is aggregated.
#[derive(Debug, Clone, Default)]
pub struct RouteDefinition {
    pub path: PathMeta,
    pub operations: IndexMap<String, OperationMetadata>,
}

impl RouteDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_meta(mut self, path: PathMeta) -> Self {
        self.path = path;
        self
    }

    pub fn operation(mut self, method: impl Into<String>, meta: OperationMetadata) -> Self {
        self.operations.insert(method.into(), meta);
        self
    }

    /// Parse a route definition from a JSON object whose keys are path-level
    /// fields and method names. Other keys are ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::SerializationError(
                "route definition must be an object".to_string(),
            ));
        };

        let mut path = Map::new();
        let mut operations = IndexMap::new();
        for (key, entry) in map {
            if PATH_FIELDS.contains(&key.as_str()) {
                path.insert(key, entry);
            } else if HttpMethod::parse(&key).is_some() {
                let meta: OperationMetadata = serde_json::from_value(entry)?;
                operations.insert(key, meta);
            } else {
                debug!("Ignoring unrecognized route key: {}", key);
            }
        }

        Ok(Self {
            path: serde_json::from_value(Value::Object(path))?,
            operations,
        })
    }
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Value>>,
    /// Lower-cased method -> operation
    #[serde(flatten)]
    pub operations: IndexMap<String, CompiledOperation>,
}

/// Build the path item for one route.
pub fn aggregate(
    route: &str,
    operations: &IndexMap<String, OperationMetadata>,
    path_meta: &PathMeta,
    normalizer: &SchemaNormalizer<'_>,
) -> PathItem {
    let mut item = PathItem {
        reference: path_meta.reference.clone(),
        summary: path_meta.summary.clone(),
        description: path_meta.description.clone(),
        servers: path_meta.servers.clone(),
        parameters: path_meta.parameters.clone(),
        operations: IndexMap::new(),
    };

    for (name, meta) in operations {
        let Some(method) = HttpMethod::parse(name) else {
            debug!("Ignoring unrecognized method {} on {}", name, route);
            continue;
        };
        item.operations
            .insert(method.key(), assemble(route, method, meta, normalizer));
    }

    item
}

/// The paths fragment a single path item contributes
pub fn to_paths(route: &str, item: &PathItem) -> Result<Paths> {
    let mut paths = Paths::new();
    paths.insert(route.to_string(), serde_json::to_value(item)?);
    Ok(paths)
}

/// Deep-merge `incoming` into `target`.
///
/// Objects merge key by key, recursively. Anything else in `incoming`,
/// arrays included, replaces the target value.
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(target), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

/// Merge two paths mappings; later values win per field, recursively.
pub fn merge_paths(mut existing: Paths, incoming: Paths) -> Paths {
    for (route, item) in incoming {
        match existing.get_mut(&route) {
            Some(current) => deep_merge(current, item),
            None => {
                existing.insert(route, item);
            }
        }
    }
    existing
}
