// ABOUTME: DeleteFileTool - deletes a file under the base directory.
// ABOUTME: Without confirm=true it only reports that confirmation is required.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::FileScope;
use crate::tool::{ParamKind, Tool, ToolSchema};

pub struct DeleteFileTool {
    scope: FileScope,
}

impl DeleteFileTool {
    pub fn new(scope: FileScope) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file. Pass confirm=true to actually delete; otherwise the deletion is only reported."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .required("file_path", ParamKind::String, "The path to the file to delete")
            .optional("confirm", ParamKind::Boolean, "Must be true to delete")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            file_path: String,
            #[serde(default)]
            confirm: Option<bool>,
        }
        let params: Params = serde_json::from_value(params)?;
        let path = self.scope.resolve(&params.file_path)?;
        let display = self.scope.relative(&path);

        if !path.is_file() {
            anyhow::bail!("File not found: {display}");
        }
        if !params.confirm.unwrap_or(false) {
            return Ok(json!({
                "deleted": false,
                "requires_confirmation": true,
                "file_path": display,
            }));
        }

        tokio::fs::remove_file(&path).await?;
        tracing::info!(path = %path.display(), "file deleted");
        Ok(json!({"deleted": true, "file_path": display}))
    }
}
