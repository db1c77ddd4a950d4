//! Layout store backed by a directory on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use outpost_core::error::{Result, SimError};
use outpost_core::layout::LayoutStore;

/// Layout files under a root directory.
///
/// Store paths such as `layouts/<map>/<name>.dat` are resolved relative
/// to the root. Missing files and directories read as empty.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn store_error(path: &str, e: &std::io::Error) -> SimError {
    SimError::Store {
        path: path.to_string(),
        message: e.to_string(),
    }
}

impl LayoutStore for DirectoryStore {
    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let entries = match fs::read_dir(self.resolve(dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_error(dir, &e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| store_error(dir, &e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| store_error(dir, &e))?
                .is_file();
            if is_file {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, path: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.resolve(path)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error(path, &e)),
        }
    }

    fn write(&mut self, path: &str, contents: &str) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| store_error(path, &e))?;
        }
        fs::write(&full, contents).map_err(|e| store_error(path, &e))?;
        tracing::debug!(path = %full.display(), bytes = contents.len(), "Wrote layout file");
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}
