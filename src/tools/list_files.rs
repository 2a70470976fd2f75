// ABOUTME: ListFilesTool - lists files under the base directory matching a glob.
// ABOUTME: Optionally recursive; directories are skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::FileScope;
use crate::tool::{ParamKind, Tool, ToolSchema};

/// Tool for listing files in a directory with glob patterns.
pub struct ListFilesTool {
    scope: FileScope,
}

impl ListFilesTool {
    pub fn new(scope: FileScope) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in a directory matching a glob pattern."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .optional("directory", ParamKind::String, "Directory to list (default: base directory)")
            .optional("pattern", ParamKind::String, "Glob pattern to match (default: *)")
            .optional("recursive", ParamKind::Boolean, "Search subdirectories too")
            .returns(json!({"type": "object", "properties": {"count": {"type": "integer"}, "files": {"type": "array"}}}))
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize, Default)]
        struct Params {
            directory: Option<String>,
            pattern: Option<String>,
            recursive: Option<bool>,
        }
        let params: Params = serde_json::from_value(params)?;

        let dir = self.scope.resolve(params.directory.as_deref().unwrap_or("."))?;
        if !dir.is_dir() {
            anyhow::bail!("Directory not found: {}", self.scope.relative(&dir));
        }
        let pattern = params.pattern.unwrap_or_else(|| "*".to_string());
        let base = glob::Pattern::escape(&dir.to_string_lossy());
        let full_pattern = if params.recursive.unwrap_or(false) {
            format!("{base}/**/{pattern}")
        } else {
            format!("{base}/{pattern}")
        };

        let mut files = Vec::new();
        for path in glob::glob(&full_pattern)?.flatten() {
            if !path.is_file() {
                continue;
            }
            let metadata = std::fs::metadata(&path)?;
            let modified = metadata.modified().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339());
            files.push(json!({
                "name": path.file_name().map(|n| n.to_string_lossy().into_owned()),
                "path": self.scope.relative(&path),
                "size_bytes": metadata.len(),
                "modified": modified,
            }));
        }

        tracing::debug!(dir = %dir.display(), pattern = %pattern, count = files.len(), "listed files");
        Ok(json!({"count": files.len(), "files": files}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(result: &Value) -> Vec<String> {
        let mut names: Vec<String> = result["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_list_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file1.txt"), "").unwrap();
        std::fs::write(dir.path().join("file2.txt"), "abc").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let tool = ListFilesTool::new(FileScope::new(dir.path()));
        let result = tool.execute(json!({})).await.unwrap();

        assert_eq!(result["count"], 2);
        assert_eq!(names(&result), vec!["file1.txt", "file2.txt"]);
    }

    #[tokio::test]
    async fn test_list_files_with_pattern_and_recursion() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.log"), "").unwrap();
        std::fs::write(dir.path().join("b.rs"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.log"), "").unwrap();

        let tool = ListFilesTool::new(FileScope::new(dir.path()));
        let flat = tool.execute(json!({"pattern": "*.log"})).await.unwrap();
        assert_eq!(names(&flat), vec!["a.log"]);

        let deep = tool.execute(json!({"pattern": "*.log", "recursive": true})).await.unwrap();
        assert_eq!(names(&deep), vec!["a.log", "nested/c.log"]);
    }

    #[tokio::test]
    async fn test_list_files_missing_directory() {
        let dir = TempDir::new().unwrap();
        let tool = ListFilesTool::new(FileScope::new(dir.path()));
        assert!(tool.execute(json!({"directory": "nope"})).await.is_err());
        assert!(tool.execute(json!({"directory": "../"})).await.is_err());
    }
}
