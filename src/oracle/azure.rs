// ABOUTME: Azure OpenAI chat-completions client.
// ABOUTME: Implements the Oracle trait over a deployment-scoped endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Oracle, OracleMessage, OracleReply, OracleRequest, OracleRole, ToolDefinition};
use crate::error::OracleError;

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Chat-completions request body.
#[derive(Debug, Serialize)]
pub struct AzureRequest {
    pub messages: Vec<AzureMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<AzureTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AzureMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AzureTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: AzureFunction,
}

#[derive(Debug, Serialize)]
pub struct AzureFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct AzureResponse {
    pub choices: Vec<AzureChoice>,
}

#[derive(Debug, Deserialize)]
pub struct AzureChoice {
    pub message: AzureResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AzureResponseMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<AzureToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct AzureToolCall {
    pub id: String,
    pub function: AzureFunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct AzureFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct AzureError {
    pub error: AzureErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct AzureErrorDetail {
    pub message: String,
}

/// Client for an Azure OpenAI deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAIClient {
    api_key: String,
    endpoint: String,
    model: String,
    api_version: String,
    http: reqwest::Client,
}

impl AzureOpenAIClient {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Build from `AZURE_OPENAI_KEY`, `AZURE_OPENAI_ENDPOINT`, and optionally
    /// `AZURE_OPENAI_MODEL` / `AZURE_OPENAI_API_VERSION`.
    pub fn from_env() -> Result<Self, OracleError> {
        let api_key = std::env::var("AZURE_OPENAI_KEY").map_err(|_| {
            OracleError::Configuration("AZURE_OPENAI_KEY environment variable not set".to_string())
        })?;
        let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").map_err(|_| {
            OracleError::Configuration("AZURE_OPENAI_ENDPOINT environment variable not set".to_string())
        })?;

        let mut client = Self::new(api_key, endpoint);
        if let Ok(model) = std::env::var("AZURE_OPENAI_MODEL") {
            client.model = model;
        }
        if let Ok(version) = std::env::var("AZURE_OPENAI_API_VERSION") {
            client.api_version = version;
        }
        Ok(client)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The chat-completions URL for the configured deployment.
    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.model, self.api_version
        )
    }
}

impl From<&ToolDefinition> for AzureTool {
    fn from(tool: &ToolDefinition) -> Self {
        AzureTool {
            tool_type: "function".to_string(),
            function: AzureFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

impl From<&OracleMessage> for AzureMessage {
    fn from(msg: &OracleMessage) -> Self {
        let role = match msg.role {
            OracleRole::User => "user",
            OracleRole::Assistant => "assistant",
        };
        AzureMessage {
            role: role.to_string(),
            content: msg.text.clone(),
        }
    }
}

impl From<&OracleRequest> for AzureRequest {
    fn from(req: &OracleRequest) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        if let Some(ref system) = req.system {
            messages.push(AzureMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(req.messages.iter().map(AzureMessage::from));

        AzureRequest {
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            tools: req.tools.iter().map(AzureTool::from).collect(),
        }
    }
}

impl TryFrom<AzureResponse> for OracleReply {
    type Error = OracleError;

    /// Only the first tool call is honoured; an agent proposes one call per step.
    fn try_from(resp: AzureResponse) -> Result<Self, Self::Error> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Malformed("response has no choices".to_string()))?;

        if let Some(call) = choice.message.tool_calls.and_then(|calls| calls.into_iter().next()) {
            // Unparseable arguments stay a raw string so schema validation rejects them.
            let raw = call.function.arguments;
            let arguments = if raw.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&raw).unwrap_or_else(|e| {
                    tracing::warn!(call_id = %call.id, error = %e, "tool call arguments are not JSON");
                    Value::String(raw)
                })
            };
            return Ok(OracleReply::ToolCall {
                name: call.function.name,
                arguments,
            });
        }

        Ok(OracleReply::Text(choice.message.content.unwrap_or_default()))
    }
}

#[async_trait]
impl Oracle for AzureOpenAIClient {
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let body = AzureRequest::from(request);
        tracing::debug!(model = %self.model, messages = body.messages.len(), tools = body.tools.len(), "oracle request");

        let response = self
            .http
            .post(self.url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            let message = serde_json::from_str::<AzureError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AzureResponse = response.json().await?;
        OracleReply::try_from(parsed)
    }
}
