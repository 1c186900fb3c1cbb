use crate::config::{CompilerConfig, ReservedPath};
use crate::error::{Error, Result};
use crate::path_aggregator::{aggregate, merge_paths, to_paths, Paths, RouteDefinition};
use crate::reporter::Reporter;
use crate::schema_normalizer::SchemaNormalizer;
use futures::future::{join_all, BoxFuture};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// OpenAPI version written into every compiled document
pub const OPENAPI_VERSION: &str = "3.1.0";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// contact, license, termsOfService, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Value>>,
    /// API paths
    #[serde(default)]
    pub paths: Paths,
    /// Components (schemas, security schemes, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Value>>,
    #[serde(
        rename = "externalDocs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_docs: Option<Value>,
    /// webhooks, x-* extensions, ...
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Default for OpenApiDocument {
    fn default() -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("API documentation generated from declared endpoints".to_string()),
                extra: Map::new(),
            },
            servers: None,
            paths: Paths::new(),
            components: Some(Value::Object(Map::new())),
            security: None,
            tags: None,
            external_docs: None,
            extensions: Map::new(),
        }
    }
}

impl OpenApiDocument {
    /// Load a hand-authored base document; `.json` files are read as JSON,
    /// anything else as YAML
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading base document from {}", path.display());
        let content = fs::read_to_string(path)?;
        let document = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(document)
    }
}

/// Source of route declarations.
///
/// Dyn-compatible through boxed futures. `resolve` may perform I/O; the
/// compiler polls one future per route concurrently and drops any future
/// still pending when its timeout expires.
pub trait RouteResolver: Send + Sync {
    /// Every route identifier known to the resolver
    fn discover(&self) -> Vec<String>;

    /// Declared operations of one route
    fn resolve<'a>(&'a self, route: &'a str) -> BoxFuture<'a, Result<RouteDefinition>>;
}

/// In-memory resolver over a fixed set of route definitions
#[derive(Debug, Default)]
pub struct StaticResolver {
    routes: IndexMap<String, RouteDefinition>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: impl Into<String>, definition: RouteDefinition) -> Self {
        self.routes.insert(route.into(), definition);
        self
    }
}

impl RouteResolver for StaticResolver {
    fn discover(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    fn resolve<'a>(&'a self, route: &'a str) -> BoxFuture<'a, Result<RouteDefinition>> {
        let result = self
            .routes
            .get(route)
            .cloned()
            .ok_or_else(|| Error::route(route, "route not found"));
        Box::pin(async move { result })
    }
}

/// Catch-all patterns never describe a single route
fn is_catch_all(route: &str) -> bool {
    route.contains("...") || route.split('/').any(|segment| segment.starts_with('*'))
}

fn route_error(route: &str, error: Error) -> Error {
    match error {
        Error::RouteResolution { .. } => error,
        other => Error::route(route, other),
    }
}

/// Compiles a base document and discovered routes into one OpenAPI document.
///
/// The compiler remembers which reserved-path collisions it already reported,
/// so each one is reported once per compiler.
pub struct DocumentCompiler {
    config: CompilerConfig,
    reporter: Arc<dyn Reporter>,
    reserved_warned: HashSet<ReservedPath>,
}

impl DocumentCompiler {
    pub fn new(config: CompilerConfig, reporter: Arc<dyn Reporter>) -> Self {
        debug!("Initializing DocumentCompiler");
        Self {
            config,
            reporter,
            reserved_warned: HashSet::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Report a collision if `route` is a reserved path, once per path.
    /// Returns whether the route is reserved.
    pub fn handle_reserved_path(&mut self, route: &str) -> bool {
        let Some(kind) = self.config.reserved_kind(route) else {
            return false;
        };
        if self.reserved_warned.insert(kind) {
            self.reporter.report(Error::ReservedPathCollision {
                path: route.to_string(),
                reserved_for: kind.name(),
                config_key: kind.config_key(),
            });
        }
        true
    }

    /// Whether `route` takes part in discovery
    pub fn should_discover(&mut self, route: &str) -> bool {
        if is_catch_all(route) {
            debug!("Skipping catch-all route {}", route);
            return false;
        }
        if self.config.is_denied(route) {
            debug!("Skipping denied route {}", route);
            return false;
        }
        !self.handle_reserved_path(route)
    }

    /// The paths fragment one route contributes
    pub fn compile_route(&self, route: &str, definition: &RouteDefinition) -> Result<Paths> {
        let normalizer = SchemaNormalizer::new(self.reporter.as_ref());
        let item = aggregate(route, &definition.operations, &definition.path, &normalizer);
        to_paths(route, &item)
    }

    /// Resolve every discoverable route concurrently and merge the results.
    ///
    /// Every fetch runs under its own `fetch_timeout_ms` limit. Routes that
    /// miss it, fail, or cannot be compiled are reported and contribute
    /// nothing. A fetch that times out is dropped, so no work outlives this
    /// call. Results merge in lexical route order.
    pub async fn discover_paths(&mut self, resolver: Arc<dyn RouteResolver>) -> Paths {
        let routes: BTreeSet<String> = resolver
            .discover()
            .into_iter()
            .filter(|route| self.should_discover(route))
            .collect();
        info!("Resolving {} routes", routes.len());

        let resolver = resolver.as_ref();
        let timeout = self.config.fetch_timeout();
        let timeout_ms = self.config.fetch_timeout_ms;
        let fetches = routes.iter().map(move |route| async move {
            let result = match tokio::time::timeout(timeout, resolver.resolve(route)).await {
                Ok(result) => result,
                Err(_) => Err(Error::route(route.as_str(), format!("no result within {} ms", timeout_ms))),
            };
            (route, result)
        });
        // join_all yields results in input order, which is lexical here.
        let resolved = join_all(fetches).await;

        let mut paths = Paths::new();
        for (route, result) in resolved {
            match result.and_then(|definition| self.compile_route(route, &definition)) {
                Ok(fragment) => {
                    debug!("Merging paths for {}", route);
                    paths = merge_paths(paths, fragment);
                }
                Err(e) => self.reporter.report(route_error(route, e)),
            }
        }
        paths
    }

    /// Compile the final document.
    ///
    /// `base` is left untouched. Discovered paths are merged over the base
    /// document's paths and `openapi` is always [`OPENAPI_VERSION`].
    pub async fn compile(&mut self, base: &OpenApiDocument, resolver: Arc<dyn RouteResolver>) -> OpenApiDocument {
        info!("Compiling OpenAPI document");
        let discovered = self.discover_paths(resolver).await;

        let mut document = base.clone();
        document.openapi = OPENAPI_VERSION.to_string();
        document.paths = merge_paths(base.paths.clone(), discovered);
        info!("OpenAPI document has {} paths", document.paths.len());
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation_assembler::{OperationMetadata, ResponseMeta};
    use crate::reporter::MemoryReporter;
    use crate::schema_adapter::{FieldSchema, ObjectSchema};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn todo_route(id: &str) -> RouteDefinition {
        RouteDefinition::new().operation(
            "GET",
            OperationMetadata {
                operation_id: Some(id.to_string()),
                responses: vec![ResponseMeta::new(
                    200,
                    ObjectSchema::new().field("id", FieldSchema::integer()),
                )],
                ..OperationMetadata::default()
            },
        )
    }

    /// Records resolved routes, fails for `/b`, hangs for anything under `/slow`.
    /// `live` counts fetches that have started and not yet been dropped.
    #[derive(Default)]
    struct ScriptedResolver {
        routes: Vec<String>,
        seen: Mutex<Vec<String>>,
        live: Arc<AtomicUsize>,
    }

    impl ScriptedResolver {
        fn new(routes: &[&str]) -> Self {
            Self {
                routes: routes.iter().map(|r| r.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    struct LiveFetch(Arc<AtomicUsize>);

    impl LiveFetch {
        fn start(counter: &Arc<AtomicUsize>) -> Self {
            counter.fetch_add(1, Ordering::SeqCst);
            Self(counter.clone())
        }
    }

    impl Drop for LiveFetch {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl RouteResolver for ScriptedResolver {
        fn discover(&self) -> Vec<String> {
            self.routes.clone()
        }

        fn resolve<'a>(&'a self, route: &'a str) -> BoxFuture<'a, Result<RouteDefinition>> {
            Box::pin(async move {
                let _live = LiveFetch::start(&self.live);
                self.seen.lock().unwrap().push(route.to_string());
                if route == "/b" {
                    return Err(Error::SerializationError("unexpected token".to_string()));
                }
                if route.starts_with("/slow") {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok(todo_route(&route.replace('/', "_")))
            })
        }
    }

    fn compiler(reporter: &Arc<MemoryReporter>) -> DocumentCompiler {
        DocumentCompiler::new(CompilerConfig::default(), reporter.clone())
    }

    #[tokio::test]
    async fn test_reserved_paths_are_not_discovered() {
        let reporter = Arc::new(MemoryReporter::new());
        let resolver = Arc::new(ScriptedResolver::new(&["/a", "/openapi.json", "/openapi.yaml", "/docs"]));

        let paths = compiler(&reporter).discover_paths(resolver.clone()).await;

        assert_eq!(*resolver.seen.lock().unwrap(), vec!["/a".to_string()]);
        let keys: Vec<_> = paths.keys().cloned().collect();
        assert_eq!(keys, vec!["/a"]);
        assert_eq!(reporter.len(), 3);
        assert!(reporter.with_events(|events| events
            .iter()
            .all(|e| matches!(e, Error::ReservedPathCollision { .. }))));
    }

    #[test]
    fn test_reserved_warning_is_reported_once_per_path() {
        let reporter = Arc::new(MemoryReporter::new());
        let mut compiler = compiler(&reporter);

        assert!(compiler.handle_reserved_path("/docs"));
        assert!(compiler.handle_reserved_path("/docs"));
        assert!(compiler.handle_reserved_path("/openapi.json"));
        assert!(!compiler.handle_reserved_path("/todos"));

        assert_eq!(reporter.len(), 2);
    }

    #[test]
    fn test_separate_compilers_do_not_share_warning_state() {
        let reporter = Arc::new(MemoryReporter::new());
        compiler(&reporter).handle_reserved_path("/docs");
        compiler(&reporter).handle_reserved_path("/docs");
        assert_eq!(reporter.len(), 2);
    }

    #[tokio::test]
    async fn test_catch_all_and_denied_routes_are_skipped_silently() {
        let reporter = Arc::new(MemoryReporter::new());
        let config = CompilerConfig {
            denied_paths: vec!["/internal".to_string()],
            ..CompilerConfig::default()
        };
        let mut compiler = DocumentCompiler::new(config, reporter.clone());
        let resolver = Arc::new(ScriptedResolver::new(&["/a", "/files/{...path}", "/static/*", "/internal"]));

        let paths = compiler.discover_paths(resolver.clone()).await;

        assert_eq!(paths.len(), 1);
        assert_eq!(*resolver.seen.lock().unwrap(), vec!["/a".to_string()]);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_failing_route_is_isolated() {
        let reporter = Arc::new(MemoryReporter::new());
        let resolver = Arc::new(ScriptedResolver::new(&["/c", "/b", "/a"]));

        let document = compiler(&reporter).compile(&OpenApiDocument::default(), resolver).await;

        let keys: Vec<_> = document.paths.keys().cloned().collect();
        assert_eq!(keys, vec!["/a", "/c"]);
        assert_eq!(document.paths["/a"]["get"]["operationId"], "_a");
        assert_eq!(reporter.len(), 1);
        let message = &reporter.messages()[0];
        assert!(message.contains("/b"));
        assert!(reporter.with_events(|events| matches!(
            &events[0],
            Error::RouteResolution { route, .. } if route == "/b"
        )));
    }

    #[tokio::test]
    async fn test_slow_route_times_out() {
        let reporter = Arc::new(MemoryReporter::new());
        let config = CompilerConfig {
            fetch_timeout_ms: 200,
            ..CompilerConfig::default()
        };
        let mut compiler = DocumentCompiler::new(config, reporter.clone());
        let resolver = Arc::new(ScriptedResolver::new(&["/a", "/slow"]));

        let started = Instant::now();
        let paths = compiler.discover_paths(resolver.clone()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(resolver.live.load(Ordering::SeqCst), 0);
        assert!(paths.contains_key("/a"));
        assert!(!paths.contains_key("/slow"));
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("/slow"));
    }

    #[tokio::test]
    async fn test_compile_forces_version_and_keeps_base() {
        let reporter = Arc::new(MemoryReporter::new());
        let mut base = OpenApiDocument::default();
        base.openapi = "3.0.0".to_string();
        base.servers = Some(vec![json!({ "url": "https://api.example.com" })]);
        base.paths.insert(
            "/health".to_string(),
            json!({ "get": { "responses": { "200": { "description": "ok" } } } }),
        );
        base.paths.insert(
            "/todos".to_string(),
            json!({ "get": { "operationId": "fromBase", "x-owner": "platform" } }),
        );
        let snapshot = base.clone();
        let resolver = Arc::new(StaticResolver::new().route("/todos", todo_route("listTodos")));

        let document = compiler(&reporter).compile(&base, resolver).await;

        assert_eq!(base, snapshot);
        assert_eq!(document.openapi, OPENAPI_VERSION);
        assert_eq!(document.servers, base.servers);
        assert_eq!(document.paths["/health"], base.paths["/health"]);
        // discovered values win, base-only fields survive
        assert_eq!(document.paths["/todos"]["get"]["operationId"], "listTodos");
        assert_eq!(document.paths["/todos"]["get"]["x-owner"], "platform");
    }

    #[tokio::test]
    async fn test_compile_is_idempotent() {
        let reporter = Arc::new(MemoryReporter::new());
        let resolver: Arc<dyn RouteResolver> = Arc::new(
            StaticResolver::new()
                .route("/z", todo_route("z"))
                .route("/m", todo_route("m"))
                .route("/a", todo_route("a")),
        );
        let base = OpenApiDocument::default();
        let mut compiler = compiler(&reporter);

        let first = serde_json::to_string(&compiler.compile(&base, resolver.clone()).await).unwrap();
        let second = serde_json::to_string(&compiler.compile(&base, resolver).await).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_compile_route_fragment() {
        let reporter = Arc::new(MemoryReporter::new());
        let fragment = compiler(&reporter)
            .compile_route("/todos", &todo_route("listTodos"))
            .unwrap();

        assert_eq!(
            fragment["/todos"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
            json!({
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"],
                "additionalProperties": false
            })
        );
    }

    #[tokio::test]
    async fn test_static_resolver_unknown_route() {
        let resolver = StaticResolver::new();
        assert!(matches!(
            resolver.resolve("/missing").await,
            Err(Error::RouteResolution { .. })
        ));
    }

    #[tokio::test]
    async fn test_timed_out_fetches_are_dropped() {
        let reporter = Arc::new(MemoryReporter::new());
        let config = CompilerConfig {
            fetch_timeout_ms: 100,
            ..CompilerConfig::default()
        };
        let mut compiler = DocumentCompiler::new(config, reporter.clone());
        let routes: Vec<String> = (0..50).map(|i| format!("/slow/{:02}", i)).collect();
        let names: Vec<&str> = routes.iter().map(String::as_str).collect();
        let resolver = Arc::new(ScriptedResolver::new(&names));

        let started = Instant::now();
        let paths = compiler.discover_paths(resolver.clone()).await;

        // fetches wait concurrently, each under its own limit
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(paths.is_empty());
        assert_eq!(resolver.seen.lock().unwrap().len(), 50);
        assert_eq!(resolver.live.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.len(), 50);
        assert!(reporter.messages()[0].contains("/slow/00"));
        assert!(reporter.messages()[0].contains("100 ms"));
    }

    #[test]
    fn test_document_extensions_round_trip() {
        let document: OpenApiDocument = serde_json::from_value(json!({
            "openapi": "3.1.0",
            "info": { "title": "T", "version": "1", "license": { "name": "MIT" } },
            "paths": {},
            "webhooks": { "ping": {} }
        }))
        .unwrap();

        assert_eq!(document.info.extra["license"]["name"], "MIT");
        assert!(document.extensions.contains_key("webhooks"));
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["webhooks"], json!({ "ping": {} }));
    }
}
