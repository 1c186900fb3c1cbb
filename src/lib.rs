//! OpenAPI from handlers - compile declared endpoint metadata into an OpenAPI document.
//!
//! Endpoints declare their operations (parameters, request bodies, responses,
//! tags, security) with schemas from any supported schema library. The
//! compiler normalizes those schemas, assembles operations and path items,
//! and merges everything over a hand-written base document.
//!
//! # Architecture
//!
//! 1. [`schema_adapter`] - Schema sources and the adapters that describe them
//! 2. [`schema_normalizer`] - Converts schema sources into canonical schemas
//! 3. [`operation_assembler`] - Builds one operation from declared metadata
//! 4. [`path_aggregator`] - Builds path items and merges paths mappings
//! 5. [`openapi_builder`] - Discovers routes and compiles the final document
//! 6. [`serializer`] - Serializes the document to YAML or JSON
//!
//! Around the core: [`reporter`] receives warnings, [`config`] holds compiler
//! settings, [`manifest`] resolves routes from files on disk, [`docs`] renders
//! the documentation page, and [`cli`] drives the command-line tool.
//!
//! # Example Usage
//!
//! ```
//! use openapi_from_handlers::{
//!     config::CompilerConfig,
//!     openapi_builder::{DocumentCompiler, OpenApiDocument, StaticResolver},
//!     operation_assembler::{OperationMetadata, ResponseMeta},
//!     path_aggregator::RouteDefinition,
//!     reporter::LogReporter,
//!     schema_adapter::{FieldSchema, ObjectSchema},
//!     serializer::serialize_yaml,
//! };
//! use std::sync::Arc;
//!
//! let todo = ObjectSchema::new()
//!     .field("id", FieldSchema::integer())
//!     .field("name", FieldSchema::string());
//!
//! let resolver = StaticResolver::new().route(
//!     "/todos",
//!     RouteDefinition::new().operation(
//!         "GET",
//!         OperationMetadata {
//!             operation_id: Some("listTodos".to_string()),
//!             responses: vec![ResponseMeta::new(200, todo)],
//!             ..OperationMetadata::default()
//!         },
//!     ),
//! );
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let mut compiler = DocumentCompiler::new(CompilerConfig::default(), Arc::new(LogReporter));
//! let document = runtime.block_on(compiler.compile(&OpenApiDocument::default(), Arc::new(resolver)));
//!
//! let yaml = serialize_yaml(&document).unwrap();
//! assert!(yaml.contains("listTodos"));
//! ```

pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod manifest;
pub mod openapi_builder;
pub mod operation_assembler;
pub mod path_aggregator;
pub mod reporter;
pub mod schema_adapter;
pub mod schema_normalizer;
pub mod serializer;
