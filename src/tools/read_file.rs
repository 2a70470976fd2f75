// ABOUTME: ReadFileTool - reads a text file under the base directory.
// ABOUTME: Returns the contents with size and modification time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::FileScope;
use crate::tool::{ParamKind, Tool, ToolSchema};

/// Tool for reading file contents.
pub struct ReadFileTool {
    scope: FileScope,
}

impl ReadFileTool {
    pub fn new(scope: FileScope) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Returns the file contents as text."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().required("file_path", ParamKind::String, "The path to the file to read")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            file_path: String,
        }
        let params: Params = serde_json::from_value(params)?;
        let path = self.scope.resolve(&params.file_path)?;

        if !path.is_file() {
            anyhow::bail!("File not found: {}", params.file_path);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let metadata = tokio::fs::metadata(&path).await?;
        let modified = metadata.modified().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339());

        Ok(json!({
            "file_path": self.scope.relative(&path),
            "content": content,
            "size_bytes": metadata.len(),
            "modified": modified,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_file_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.log"), "Hello, world!\n").unwrap();

        let tool = ReadFileTool::new(FileScope::new(dir.path()));
        let result = tool.execute(json!({"file_path": "app.log"})).await.unwrap();

        assert_eq!(result["content"], "Hello, world!\n");
        assert_eq!(result["size_bytes"], 14);
        assert_eq!(result["file_path"], "app.log");
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let dir = TempDir::new().unwrap();
        let tool = ReadFileTool::new(FileScope::new(dir.path()));

        let err = tool.execute(json!({"file_path": "missing.txt"})).await.unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[tokio::test]
    async fn test_read_file_outside_base() {
        let dir = TempDir::new().unwrap();
        let tool = ReadFileTool::new(FileScope::new(dir.path()));

        let err = tool.execute(json!({"file_path": "../secret"})).await.unwrap_err();
        assert!(err.to_string().contains("escapes"));
    }
}
