//! Compiler configuration.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```yaml
//! openapi_json_path: /api/openapi.json
//! denied_paths:
//!   - /api/internal/health
//! fetch_timeout_ms: 2000
//! docs:
//!   provider: redoc
//!   title: Todo API
//! ```

use crate::docs::DocsConfig;
use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Paths the generated endpoints occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReservedPath {
    OpenApiJson,
    OpenApiYaml,
    Docs,
}

impl ReservedPath {
    pub const ALL: [ReservedPath; 3] = [
        ReservedPath::OpenApiJson,
        ReservedPath::OpenApiYaml,
        ReservedPath::Docs,
    ];

    /// What the path is reserved for
    pub fn name(&self) -> &'static str {
        match self {
            ReservedPath::OpenApiJson => "OpenAPI JSON spec",
            ReservedPath::OpenApiYaml => "OpenAPI YAML spec",
            ReservedPath::Docs => "the documentation page",
        }
    }

    /// Config key that moves the path
    pub fn config_key(&self) -> &'static str {
        match self {
            ReservedPath::OpenApiJson => "openapi_json_path",
            ReservedPath::OpenApiYaml => "openapi_yaml_path",
            ReservedPath::Docs => "docs_path",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub openapi_json_path: String,
    pub openapi_yaml_path: String,
    pub docs_path: String,
    /// Routes left out of discovery without a warning
    pub denied_paths: Vec<String>,
    /// Bounded wait for each route's metadata
    pub fetch_timeout_ms: u64,
    pub docs: DocsConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            openapi_json_path: "/openapi.json".to_string(),
            openapi_yaml_path: "/openapi.yaml".to_string(),
            docs_path: "/docs".to_string(),
            denied_paths: Vec::new(),
            fetch_timeout_ms: 5000,
            docs: DocsConfig::default(),
        }
    }
}

impl CompilerConfig {
    /// Load a config file; `.json` files are read as JSON, anything else as YAML
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        let parsed = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| Error::Config {
            file: path.to_path_buf(),
            message,
        })
    }

    pub fn reserved_path(&self, kind: ReservedPath) -> &str {
        match kind {
            ReservedPath::OpenApiJson => &self.openapi_json_path,
            ReservedPath::OpenApiYaml => &self.openapi_yaml_path,
            ReservedPath::Docs => &self.docs_path,
        }
    }

    /// Which reserved path, if any, `route` occupies
    pub fn reserved_kind(&self, route: &str) -> Option<ReservedPath> {
        ReservedPath::ALL
            .into_iter()
            .find(|kind| self.reserved_path(*kind) == route)
    }

    pub fn is_denied(&self, route: &str) -> bool {
        self.denied_paths.iter().any(|denied| denied == route)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
