use openapi_from_handlers::{
    config::CompilerConfig,
    error::Error,
    manifest::ManifestResolver,
    openapi_builder::{DocumentCompiler, OpenApiDocument, RouteResolver, StaticResolver, OPENAPI_VERSION},
    operation_assembler::{OperationMetadata, RequestBodyDecl, RequestBodyMeta, ResponseMeta},
    path_aggregator::{PathMeta, RouteDefinition},
    reporter::MemoryReporter,
    schema_adapter::{FieldSchema, ObjectSchema, SchemaSource},
    serializer::{serialize_json, serialize_yaml},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

async fn compile_fixtures(reporter: &Arc<MemoryReporter>) -> OpenApiDocument {
    let base = OpenApiDocument::load(&fixtures().join("base.yaml")).expect("Failed to load base document");
    let resolver = ManifestResolver::scan(fixtures().join("routes")).expect("Failed to scan routes");
    let mut compiler = DocumentCompiler::new(CompilerConfig::default(), reporter.clone());
    compiler.compile(&base, Arc::new(resolver)).await
}

#[tokio::test]
async fn test_manifest_end_to_end_generation() {
    let reporter = Arc::new(MemoryReporter::new());
    let document = compile_fixtures(&reporter).await;

    // Base document fields survive, version is forced
    assert_eq!(document.openapi, OPENAPI_VERSION);
    assert_eq!(document.info.title, "Todo API");
    assert_eq!(document.info.extra["license"]["name"], "MIT");
    assert_eq!(document.servers, Some(vec![json!({ "url": "https://api.example.com" })]));
    assert!(document.components.as_ref().unwrap()["securitySchemes"]["bearer"].is_object());

    // Base paths first, then discovered routes in lexical order
    let keys: Vec<_> = document.paths.keys().cloned().collect();
    assert_eq!(keys, vec!["/health", "/todos", "/todos/{id}", "/upload"]);

    // Discovered operations merge over the base path item
    let todos = &document.paths["/todos"];
    assert_eq!(todos["summary"], "Todo collection");
    assert_eq!(todos["get"]["operationId"], "listTodos");
    assert_eq!(todos["get"]["summary"], "From the base document");
    assert_eq!(todos["get"]["x-owner"], "platform");
    assert!(todos.get("trace").is_none());
}

#[tokio::test]
async fn test_manifest_operations_are_compiled() {
    let reporter = Arc::new(MemoryReporter::new());
    let document = compile_fixtures(&reporter).await;

    let list = &document.paths["/todos"]["get"];
    let parameters = list["parameters"].as_array().unwrap();
    assert_eq!(parameters.len(), 2);
    assert_eq!(parameters[0]["name"], "page");
    assert_eq!(parameters[0]["in"], "query");
    assert_eq!(parameters[0]["required"], false);
    assert_eq!(parameters[1]["required"], true);

    let ok_schema = &list["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(ok_schema["properties"]["total"], json!({ "type": "integer", "example": 42 }));
    assert_eq!(
        ok_schema["properties"]["items"]["items"]["properties"]["name"],
        json!({ "type": "string" })
    );
    assert_eq!(list["responses"]["500"]["description"], "unexpected error");

    let create = &document.paths["/todos"]["post"];
    assert_eq!(create["requestBody"]["required"], true);
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"]["properties"]["name"],
        json!({ "type": "string", "example": "Buy milk", "description": "Todo title" })
    );
    let statuses: Vec<_> = create["responses"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(statuses, vec!["500", "201"]);
    assert_eq!(create["responses"]["201"]["description"], "Auto-generated description.");

    let by_id = &document.paths["/todos/{id}"];
    assert_eq!(by_id["parameters"][0]["name"], "id");
    assert_eq!(by_id["delete"]["deprecated"], true);
    let delete_statuses: Vec<_> = by_id["delete"]["responses"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(delete_statuses, vec!["500"]);
}

#[tokio::test]
async fn test_manifest_failures_become_warnings() {
    let reporter = Arc::new(MemoryReporter::new());
    let document = compile_fixtures(&reporter).await;

    // upload.yaml declares a non-object body schema: empty schema plus a warning
    assert_eq!(
        document.paths["/upload"]["post"]["requestBody"]["content"]["application/octet-stream"]["schema"],
        json!({})
    );

    assert_eq!(reporter.len(), 3, "warnings: {:?}", reporter.messages());
    reporter.with_events(|events| {
        assert!(events.iter().any(|e| matches!(
            e,
            Error::ReservedPathCollision { path, .. } if path == "/docs"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            Error::RouteResolution { route, .. } if route == "/broken"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            Error::UnsupportedSchemaKind { operation_id, .. } if operation_id == "uploadFile"
        )));
    });

    // catch-all and reserved routes never show up as operations
    assert!(!document.paths.contains_key("/files/{...path}"));
    assert!(!document.paths.contains_key("/docs"));
    assert!(!document.paths.contains_key("/broken"));
}

#[tokio::test]
async fn test_compiled_document_serializations_agree() {
    let reporter = Arc::new(MemoryReporter::new());
    let first = compile_fixtures(&reporter).await;
    let second = compile_fixtures(&reporter).await;

    let json_first = serialize_json(&first).expect("Failed to serialize to JSON");
    let json_second = serialize_json(&second).expect("Failed to serialize to JSON");
    assert_eq!(json_first, json_second);

    let yaml = serialize_yaml(&first).expect("Failed to serialize to YAML");
    assert_eq!(yaml, serialize_yaml(&second).unwrap());

    let from_json: Value = serde_json::from_str(&json_first).unwrap();
    let from_yaml: Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(from_json, from_yaml);
}

#[tokio::test]
async fn test_rust_declared_endpoints() {
    let todo = ObjectSchema::new()
        .field("id", FieldSchema::integer().openapi(json!({ "example": 1 })))
        .field("name", FieldSchema::string().describe("Todo title"))
        .field("completed", FieldSchema::boolean().optional());

    let resolver = StaticResolver::new()
        .route(
            "/v2/todos",
            RouteDefinition::new()
                .with_path_meta(PathMeta {
                    description: Some("Todos, version two".to_string()),
                    ..PathMeta::default()
                })
                .operation(
                    "GET",
                    OperationMetadata {
                        operation_id: Some("getTodos".to_string()),
                        responses: vec![ResponseMeta::new(200, todo.clone()).with_description("Todos")],
                        ..OperationMetadata::default()
                    },
                )
                .operation(
                    "POST",
                    OperationMetadata {
                        operation_id: Some("createTodo".to_string()),
                        request_body: Some(RequestBodyMeta::Declared(RequestBodyDecl::new(todo))),
                        responses: vec![ResponseMeta::new(201, SchemaSource::Opaque(json!("raw")))],
                        ..OperationMetadata::default()
                    },
                ),
        )
        .route("/docs", RouteDefinition::new());

    let reporter = Arc::new(MemoryReporter::new());
    let mut compiler = DocumentCompiler::new(CompilerConfig::default(), reporter.clone());
    let document = compiler.compile(&OpenApiDocument::default(), Arc::new(resolver)).await;

    let keys: Vec<_> = document.paths.keys().cloned().collect();
    assert_eq!(keys, vec!["/v2/todos"]);

    let todos = &document.paths["/v2/todos"];
    assert_eq!(todos["description"], "Todos, version two");
    assert_eq!(
        todos["get"]["responses"]["200"]["content"]["application/json"]["schema"],
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer", "example": 1 },
                "name": { "type": "string", "description": "Todo title" },
                "completed": { "type": "boolean" }
            },
            "required": ["id", "name"],
            "additionalProperties": false
        })
    );
    assert_eq!(todos["post"]["responses"]["201"]["content"]["application/json"]["schema"], json!({}));

    // one reserved-path collision (/docs) and one conversion failure (201 body)
    assert_eq!(reporter.len(), 2);
    assert!(reporter.messages().iter().any(|m| m.contains("output-body") && m.contains("createTodo")));
}

#[tokio::test]
async fn test_resolver_trait_objects_are_interchangeable() {
    let resolvers: Vec<Arc<dyn RouteResolver>> = vec![
        Arc::new(StaticResolver::new().route("/todos", RouteDefinition::new())),
        Arc::new(ManifestResolver::scan(fixtures().join("routes")).unwrap()),
    ];

    for resolver in resolvers {
        assert!(resolver.discover().contains(&"/todos".to_string()));
        assert!(resolver.resolve("/todos").await.is_ok());
        assert!(matches!(
            resolver.resolve("/missing").await,
            Err(Error::RouteResolution { .. })
        ));
    }
}
