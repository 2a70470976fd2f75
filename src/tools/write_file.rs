// ABOUTME: WriteFileTool - writes content to a file under the base directory.
// ABOUTME: Creates parent directories if needed, overwrites existing files.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::FileScope;
use crate::tool::{ParamKind, Tool, ToolSchema};

/// Tool for writing content to files.
pub struct WriteFileTool {
    scope: FileScope,
}

impl WriteFileTool {
    pub fn new(scope: FileScope) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file if it doesn't exist, overwrites if it does."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .required("file_path", ParamKind::String, "The path to the file to write")
            .required("content", ParamKind::String, "The content to write to the file")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            file_path: String,
            content: String,
        }
        let params: Params = serde_json::from_value(params)?;
        let path = self.scope.resolve(&params.file_path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &params.content).await?;
        tracing::info!(path = %path.display(), bytes = params.content.len(), "file written");

        Ok(json!({
            "file_path": self.scope.relative(&path),
            "bytes_written": params.content.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let tool = WriteFileTool::new(FileScope::new(dir.path()));

        let result = tool
            .execute(json!({"file_path": "reports/today.txt", "content": "3 VMs"}))
            .await
            .unwrap();

        assert_eq!(result["bytes_written"], 5);
        let written = std::fs::read_to_string(dir.path().join("reports/today.txt")).unwrap();
        assert_eq!(written, "3 VMs");
    }

    #[tokio::test]
    async fn test_write_file_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let tool = WriteFileTool::new(FileScope::new(dir.path()));

        assert!(tool
            .execute(json!({"file_path": "../evil.txt", "content": "x"}))
            .await
            .is_err());
    }
}
