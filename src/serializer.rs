//! Serialization module for converting OpenAPI documents to YAML or JSON format.
//!
//! Both encodings are produced from the same in-memory [`OpenApiDocument`], so
//! parsing either one back yields the same structure.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_handlers::openapi_builder::OpenApiDocument;
/// use openapi_from_handlers::serializer::serialize_yaml;
///
/// let yaml = serialize_yaml(&OpenApiDocument::default()).unwrap();
/// assert!(yaml.contains("openapi: 3.1.0"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file.
///
/// Creates the file and any missing parent directories, or overwrites the
/// file if it exists.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
