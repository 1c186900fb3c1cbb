use crate::error::{Error, Result};
use crate::openapi_builder::RouteResolver;
use crate::path_aggregator::RouteDefinition;
use futures::future::BoxFuture;
use log::{debug, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Route resolver over a directory of route manifests.
///
/// Each `.json`, `.yaml` or `.yml` file describes one route. Its path relative
/// to the root becomes the route:
///
/// | File | Route |
/// |---|---|
/// | `todos/index.yaml` | `/todos` |
/// | `todos/[id].yaml` | `/todos/{id}` |
/// | `files/[...path].json` | `/files/{...path}` (catch-all) |
///
/// # Example
///
/// ```no_run
/// use openapi_from_handlers::manifest::ManifestResolver;
/// use openapi_from_handlers::openapi_builder::RouteResolver;
/// use std::path::PathBuf;
///
/// let resolver = ManifestResolver::scan(PathBuf::from("./routes")).unwrap();
/// println!("Found {} routes", resolver.discover().len());
/// ```
#[derive(Debug)]
pub struct ManifestResolver {
    root_path: PathBuf,
    routes: BTreeMap<String, PathBuf>,
    warnings: Vec<String>,
}

const MANIFEST_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

impl ManifestResolver {
    /// Scans the directory tree under `root_path` for manifests.
    ///
    /// Hidden directories are skipped. Inaccessible entries and duplicate
    /// routes are recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if `root_path` is not a directory.
    pub fn scan(root_path: PathBuf) -> Result<Self> {
        if !root_path.is_dir() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("routes directory not found: {}", root_path.display()),
            )));
        }

        let mut routes: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            };

            let path = entry.path();
            let is_manifest = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext));
            if !path.is_file() || !is_manifest {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&root_path) else {
                continue;
            };
            let route = Self::route_for(relative);
            if let Some(existing) = routes.get(&route) {
                let warning = format!(
                    "Route {} is declared by both {} and {}; keeping the first",
                    route,
                    existing.display(),
                    path.display()
                );
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }
            debug!("Found manifest {} for route {}", path.display(), route);
            routes.insert(route, path.to_path_buf());
        }

        Ok(Self {
            root_path,
            routes,
            warnings,
        })
    }

    /// Route for a manifest path relative to the root
    pub fn route_for(relative: &Path) -> String {
        let mut segments: Vec<String> = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.last().is_some_and(|last| last == "index") {
            segments.pop();
        }

        let converted: Vec<String> = segments
            .iter()
            .map(|segment| match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                Some(name) => format!("{{{}}}", name),
                None => segment.clone(),
            })
            .collect();

        format!("/{}", converted.join("/"))
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Warnings collected while scanning
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    async fn read_manifest(path: &Path) -> Result<Value> {
        let content = tokio::fs::read_to_string(path).await?;
        let value = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(value)
    }
}

impl RouteResolver for ManifestResolver {
    fn discover(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    fn resolve<'a>(&'a self, route: &'a str) -> BoxFuture<'a, Result<RouteDefinition>> {
        Box::pin(async move {
            let path = self
                .routes
                .get(route)
                .ok_or_else(|| Error::route(route, "no manifest declares this route"))?;
            debug!("Reading manifest {}", path.display());

            Self::read_manifest(path)
                .await
                .and_then(RouteDefinition::from_value)
                .map_err(|e| Error::route(route, format!("{}: {}", path.display(), e)))
        })
    }
}
