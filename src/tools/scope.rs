// ABOUTME: FileScope - confines file tool paths to one base directory.
// ABOUTME: Rejects parent-directory components and absolute paths outside the base.

use std::path::{Component, Path, PathBuf};

use anyhow::bail;

/// Base directory the file tools operate in.
#[derive(Debug, Clone)]
pub struct FileScope {
    base: PathBuf,
}

impl FileScope {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve `path` (relative to the base, or absolute inside it).
    pub fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let candidate = Path::new(path);
        if candidate.components().any(|c| matches!(c, Component::ParentDir)) {
            bail!("Path escapes the base directory: {path}");
        }
        if candidate.is_absolute() {
            if !candidate.starts_with(&self.base) {
                bail!("Path is outside the base directory: {path}");
            }
            return Ok(candidate.to_path_buf());
        }
        Ok(self.base.join(candidate))
    }

    /// Display form of `path` relative to the base.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.base).unwrap_or(path).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_inside_base() {
        let scope = FileScope::new("/srv/work");
        assert_eq!(scope.resolve("logs/app.log").unwrap(), PathBuf::from("/srv/work/logs/app.log"));
        assert_eq!(scope.resolve("/srv/work/a.txt").unwrap(), PathBuf::from("/srv/work/a.txt"));
        assert_eq!(scope.relative(Path::new("/srv/work/logs/app.log")), "logs/app.log");
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let scope = FileScope::new("/srv/work");
        assert!(scope.resolve("../etc/passwd").is_err());
        assert!(scope.resolve("logs/../../etc").is_err());
        assert!(scope.resolve("/etc/passwd").is_err());
    }
}
