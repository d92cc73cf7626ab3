//! Mapping of engine-native targets to project resources.
//!
//! Engines report positions by class name. Clients want the workspace file
//! behind it, so adapters ask a [`ResourceLocator`] to translate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tether_model::Location;
use tracing::debug;

/// Workspace file backing a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    /// `/<project>/<path inside project>`.
    pub resource_path: String,
    /// `/<project>`.
    pub project_path: String,
}

pub trait ResourceLocator: Send + Sync {
    fn locate(&self, target: &str) -> Option<ResourceLocation>;

    /// Fill in the resource fields of `location` when the target is known.
    fn enrich(&self, location: Location) -> Location {
        match self.locate(&location.target) {
            Some(found) => location.with_resource(found.resource_path, found.project_path),
            None => location,
        }
    }
}

/// Locator that knows nothing; locations pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLocator;

impl ResourceLocator for NoopLocator {
    fn locate(&self, _target: &str) -> Option<ResourceLocation> {
        None
    }
}

/// Fixed target → resource table.
#[derive(Debug, Default, Clone)]
pub struct StaticLocator {
    entries: HashMap<String, ResourceLocation>,
}

impl StaticLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(
        mut self,
        target: impl Into<String>,
        resource_path: impl Into<String>,
        project_path: impl Into<String>,
    ) -> Self {
        self.entries.insert(
            target.into(),
            ResourceLocation {
                resource_path: resource_path.into(),
                project_path: project_path.into(),
            },
        );
        self
    }
}

impl ResourceLocator for StaticLocator {
    fn locate(&self, target: &str) -> Option<ResourceLocation> {
        self.entries.get(target).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    pub name: String,
    pub root: PathBuf,
}

/// Searches project roots for the source file of a class.
///
/// `com.acme.Main$Inner` is looked up as `**/com/acme/Main.*` below each
/// root, in declaration order. Results, including misses, are cached.
#[derive(Debug, Default)]
pub struct ProjectLocator {
    projects: Vec<ProjectRoot>,
    cache: Mutex<HashMap<String, Option<ResourceLocation>>>,
}

impl ProjectLocator {
    #[must_use]
    pub fn new(projects: Vec<ProjectRoot>) -> Self {
        Self {
            projects,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn search(&self, target: &str) -> Option<ResourceLocation> {
        let outer = target.split('$').next().unwrap_or(target);
        let relative = outer.replace('.', "/");
        if relative.is_empty() {
            return None;
        }
        for project in &self.projects {
            let root = glob::Pattern::escape(&project.root.to_string_lossy());
            let pattern = format!("{root}/**/{relative}.*");
            let Ok(paths) = glob::glob(&pattern) else {
                debug!("invalid locator pattern {pattern}");
                continue;
            };
            let mut found: Vec<PathBuf> = paths
                .filter_map(Result::ok)
                .filter(|path| path.is_file())
                .collect();
            found.sort();
            if let Some(path) = found.first() {
                return Some(project_resource(project, path));
            }
        }
        None
    }
}

fn project_resource(project: &ProjectRoot, path: &Path) -> ResourceLocation {
    let inner = path.strip_prefix(&project.root).unwrap_or(path);
    let inner: Vec<String> = inner
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    ResourceLocation {
        resource_path: format!("/{}/{}", project.name, inner.join("/")),
        project_path: format!("/{}", project.name),
    }
}

impl ResourceLocator for ProjectLocator {
    fn locate(&self, target: &str) -> Option<ResourceLocation> {
        if let Some(hit) = self.cache.lock().get(target) {
            return hit.clone();
        }
        let found = self.search(target);
        self.cache.lock().insert(target.to_string(), found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn static_locator_enriches_known_targets() {
        let locator =
            StaticLocator::new().with("com.HelloWorld", "/test/src/com/HelloWorld.java", "/test");
        let location = locator.enrich(Location::new("com.HelloWorld", 24));
        assert_eq!(
            location.resource_path.as_deref(),
            Some("/test/src/com/HelloWorld.java")
        );
        assert_eq!(location.resource_project_path.as_deref(), Some("/test"));

        let other = locator.enrich(Location::new("java.lang.Thread", 10));
        assert_eq!(other.resource_path, None);
    }

    #[test]
    fn project_locator_finds_sources_below_roots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("test");
        fs::create_dir_all(root.join("src/com")).unwrap();
        fs::write(root.join("src/com/HelloWorld.java"), "class HelloWorld {}").unwrap();

        let locator = ProjectLocator::new(vec![ProjectRoot {
            name: "test".into(),
            root,
        }]);
        let expected = ResourceLocation {
            resource_path: "/test/src/com/HelloWorld.java".into(),
            project_path: "/test".into(),
        };
        assert_eq!(locator.locate("com.HelloWorld"), Some(expected.clone()));
        assert_eq!(locator.locate("com.HelloWorld$Greeter"), Some(expected));
        assert_eq!(locator.locate("com.Missing"), None);
    }
}
