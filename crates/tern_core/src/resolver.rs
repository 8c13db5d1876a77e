//! Search-path based resolution of asset file names.

use std::path::{Path, PathBuf};

/// Ordered list of directories to look up relative asset names in.
///
/// Scenes reference meshes and textures by names relative to the scene file,
/// so the loader prepends the scene's directory before parsing.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    search_paths: Vec<PathBuf>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `path` before every existing entry.
    pub fn prepend(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.insert(0, path.into());
    }

    /// Search `path` after every existing entry.
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// The first `search_path/name` that exists, or `name` unchanged.
    ///
    /// Absolute names are returned as-is.
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() {
            return name.to_path_buf();
        }

        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| name.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tern_resolver_{}_{tag}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_unresolved_name_is_returned_unchanged() {
        let resolver = FileResolver::new();
        assert_eq!(resolver.resolve("nowhere/mesh.obj"), PathBuf::from("nowhere/mesh.obj"));
    }

    #[test]
    fn test_search_order() {
        let first = scratch_dir("first");
        let second = scratch_dir("second");
        fs::write(first.join("a.obj"), "").unwrap();
        fs::write(second.join("a.obj"), "").unwrap();
        fs::write(second.join("b.obj"), "").unwrap();

        let mut resolver = FileResolver::new();
        resolver.append(&second);
        resolver.prepend(&first);
        assert_eq!(resolver.search_paths(), &[first.clone(), second.clone()]);

        assert_eq!(resolver.resolve("a.obj"), first.join("a.obj"));
        assert_eq!(resolver.resolve("b.obj"), second.join("b.obj"));

        fs::remove_dir_all(&first).unwrap();
        fs::remove_dir_all(&second).unwrap();
    }
}
