// ABOUTME: Defines the Tool trait - the executable side of a registry entry.
// ABOUTME: Tools have a name, description, declared schema, and async execute method.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::Value;

use super::ToolSchema;

/// A domain tool that a capability agent can invoke.
///
/// `execute` receives arguments that already passed [`ToolSchema::validate`];
/// any `Err` it returns is a domain error and ends up as an error
/// [`ToolResult`](super::ToolResult), never as a propagated failure.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description for the oracle.
    fn description(&self) -> &str;

    /// Returns the declared parameter and return shape.
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with validated arguments.
    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error>;
}

type BoxedExecutor =
    Box<dyn Fn(Value) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync>;

/// A tool assembled from a closure, for embedding and tests.
pub struct FnTool {
    name: String,
    description: String,
    schema: ToolSchema,
    executor: BoxedExecutor,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        executor: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            executor: Box::new(move |params| Box::pin(executor(params))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        (self.executor)(params).await
    }
}
