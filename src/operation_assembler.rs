use crate::path_aggregator::HttpMethod;
use crate::schema_adapter::SchemaSource;
use crate::schema_normalizer::{CanonicalSchema, SchemaContext, SchemaNormalizer, SchemaRole};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Content type used when a declaration names none
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Description of the fallback `500` response
pub const UNEXPECTED_ERROR_DESCRIPTION: &str = "unexpected error";

/// Description given to declared responses that carry none
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Auto-generated description.";

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// Declared metadata for one method of one endpoint.
///
/// Built once when the endpoint is declared and never modified afterwards.
/// Fields other than `request_body`, `responses`, `query` and `params` are
/// copied into the compiled operation untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub external_docs: Option<Value>,
    pub operation_id: Option<String>,
    pub parameters: Option<Vec<Value>>,
    pub request_body: Option<RequestBodyMeta>,
    #[serde(default)]
    pub responses: Vec<ResponseMeta>,
    pub callbacks: Option<Value>,
    pub deprecated: Option<bool>,
    pub security: Option<Vec<Value>>,
    pub servers: Option<Vec<Value>>,
    /// Query string schema; each field becomes an `in: query` parameter
    pub query: Option<SchemaSource>,
    /// Path parameter schema; each field becomes an `in: path` parameter
    pub params: Option<SchemaSource>,
}

/// Request body as declared on an endpoint
#[derive(Debug, Clone)]
pub enum RequestBodyMeta {
    /// Content type plus schema, compiled into a request body object
    Declared(RequestBodyDecl),
    /// A ready-made request body object, or one without a schema, passed through as is
    Literal(Value),
}

impl<'de> Deserialize<'de> for RequestBodyMeta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        // Without a schema there is nothing to compile.
        if value.get("content").is_some() || value.get("schema").is_none() {
            return Ok(RequestBodyMeta::Literal(value));
        }
        serde_json::from_value(value)
            .map(RequestBodyMeta::Declared)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodyDecl {
    pub description: Option<String>,
    pub required: Option<bool>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub schema: SchemaSource,
    pub example: Option<Value>,
    pub examples: Option<Value>,
    pub encoding: Option<Value>,
}

impl RequestBodyDecl {
    pub fn new(schema: impl Into<SchemaSource>) -> Self {
        Self {
            description: None,
            required: None,
            content_type: default_content_type(),
            schema: schema.into(),
            example: None,
            examples: None,
            encoding: None,
        }
    }
}

/// One declared response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Entries without a status are skipped
    pub status: Option<u16>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub schema: Option<SchemaSource>,
    pub description: Option<String>,
    pub headers: Option<Value>,
    pub links: Option<Value>,
    pub example: Option<Value>,
    pub examples: Option<Value>,
    pub encoding: Option<Value>,
}

impl ResponseMeta {
    pub fn new(status: u16, schema: impl Into<SchemaSource>) -> Self {
        Self {
            status: Some(status),
            content_type: default_content_type(),
            schema: Some(schema.into()),
            description: None,
            headers: None,
            links: None,
            example: None,
            examples: None,
            encoding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<CanonicalSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Value>,
}

/// Compiled OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Compiled(CompiledRequestBody),
    Literal(Value),
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Operation object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledOperation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callbacks: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Value>>,
}

/// Schema of the fallback error body: `{ message: string }`
pub fn error_message_schema() -> CanonicalSchema {
    let mut schema = CanonicalSchema::typed("object");
    schema
        .properties
        .insert("message".to_string(), CanonicalSchema::typed("string"));
    schema.required.push("message".to_string());
    schema.additional_properties = Some(Value::Bool(false));
    schema
}

/// Responses every operation starts from
pub fn default_responses() -> IndexMap<String, Response> {
    let mut content = IndexMap::new();
    content.insert(
        DEFAULT_CONTENT_TYPE.to_string(),
        MediaType {
            schema: Some(error_message_schema()),
            ..MediaType::default()
        },
    );

    let mut responses = IndexMap::new();
    responses.insert(
        "500".to_string(),
        Response {
            description: UNEXPECTED_ERROR_DESCRIPTION.to_string(),
            headers: None,
            links: None,
            content: Some(content),
        },
    );
    responses
}

/// Build the operation object for one method of one route.
///
/// Schemas are converted through `normalizer`; conversion failures surface as
/// warnings on its reporter and never abort the operation.
pub fn assemble(
    route: &str,
    method: HttpMethod,
    meta: &OperationMetadata,
    normalizer: &SchemaNormalizer<'_>,
) -> CompiledOperation {
    debug!("Assembling operation: {} {}", method, route);

    let label = meta
        .operation_id
        .clone()
        .unwrap_or_else(|| format!("{} {}", method, route));
    let operation_id = label.as_str();
    let context = |role: SchemaRole| SchemaContext { operation_id, role };

    let request_body = meta.request_body.as_ref().map(|body| match body {
        RequestBodyMeta::Declared(decl) => {
            let schema = normalizer.normalize(&decl.schema, context(SchemaRole::InputBody));
            let mut content = IndexMap::new();
            content.insert(
                decl.content_type.clone(),
                MediaType {
                    schema: Some(schema),
                    example: decl.example.clone(),
                    examples: decl.examples.clone(),
                    encoding: decl.encoding.clone(),
                },
            );
            RequestBody::Compiled(CompiledRequestBody {
                description: decl.description.clone(),
                required: decl.required,
                content,
            })
        }
        RequestBodyMeta::Literal(value) => RequestBody::Literal(value.clone()),
    });

    let mut responses = default_responses();
    for declared in &meta.responses {
        let Some(status) = declared.status else {
            debug!("Skipping response without status for {}", operation_id);
            continue;
        };
        let schema = declared
            .schema
            .as_ref()
            .map(|s| normalizer.normalize(s, context(SchemaRole::OutputBody)));

        let mut content = IndexMap::new();
        content.insert(
            declared.content_type.clone(),
            MediaType {
                schema,
                example: declared.example.clone(),
                examples: declared.examples.clone(),
                encoding: declared.encoding.clone(),
            },
        );
        responses.insert(
            status.to_string(),
            Response {
                description: declared
                    .description
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RESPONSE_DESCRIPTION.to_string()),
                headers: declared.headers.clone(),
                links: declared.links.clone(),
                content: Some(content),
            },
        );
    }

    let mut parameters = meta.parameters.clone().unwrap_or_default();
    if let Some(params) = &meta.params {
        let schema = normalizer.normalize(params, context(SchemaRole::InputParams));
        parameters.extend(schema_parameters(&schema, "path"));
    }
    if let Some(query) = &meta.query {
        let schema = normalizer.normalize(query, context(SchemaRole::InputQuery));
        parameters.extend(schema_parameters(&schema, "query"));
    }
    let parameters = if parameters.is_empty() && meta.parameters.is_none() {
        None
    } else {
        Some(parameters)
    };

    CompiledOperation {
        tags: meta.tags.clone(),
        summary: meta.summary.clone(),
        description: meta.description.clone(),
        external_docs: meta.external_docs.clone(),
        operation_id: meta.operation_id.clone(),
        parameters,
        request_body,
        responses,
        callbacks: meta.callbacks.clone(),
        deprecated: meta.deprecated,
        security: meta.security.clone(),
        servers: meta.servers.clone(),
    }
}

/// One parameter object per property of a normalized schema
fn schema_parameters(schema: &CanonicalSchema, location: &str) -> Vec<Value> {
    schema
        .properties
        .iter()
        .map(|(name, property)| {
            // Path parameters are always required in OpenAPI.
            let required = location == "path" || schema.required.contains(name);
            let mut parameter = json!({
                "name": name,
                "in": location,
                "required": required,
                "schema": property,
            });
            if let Some(description) = property.metadata.get("description") {
                parameter["description"] = description.clone();
            }
            parameter
        })
        .collect()
}
