//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API
//! with vision support (image content parts):
//! - OpenAI / Azure OpenAI
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp with a multimodal model
//!
//! # Configuration
//!
//! Environment variables:
//! - `LEDGERLENS_AI_HOST`: Server URL (required)
//! - `LEDGERLENS_AI_MODEL`: Model name (default: gpt-4o-mini)
//! - `LEDGERLENS_AI_API_KEY`: API key if required (optional)

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ChatRole, DocumentKind};
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::{parse_chat_reply, parse_extraction, parse_insights};
use super::types::{ChatReply, ChatRequest, ExtractionResult};
use super::ExtractionBackend;

/// Default per-call timeout; expiry is treated as a transport failure
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI-compatible extraction backend
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl Clone for OpenAICompatibleBackend {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout: self.timeout,
            prompts: self.prompts.clone(),
        }
    }
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create from environment variables
    ///
    /// Required: `LEDGERLENS_AI_HOST`
    /// Optional: `LEDGERLENS_AI_MODEL` (default: gpt-4o-mini)
    /// Optional: `LEDGERLENS_AI_API_KEY`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("LEDGERLENS_AI_HOST").ok()?;
        let model =
            std::env::var("LEDGERLENS_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let api_key = std::env::var("LEDGERLENS_AI_API_KEY").ok();

        let mut backend = Self::new(&host, &model);
        backend.api_key = api_key;
        Some(backend)
    }

    /// Make a chat completion request and return the raw reply text
    async fn completion(
        &self,
        messages: Vec<WireMessage>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.1),
            max_tokens,
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "extraction service returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let decoded: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("invalid completion envelope: {}", e)))?;

        decoded
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::MalformedResponse("completion had no choices".into()))
    }

    /// Render the system and user sections of a prompt
    fn render_prompt(
        &self,
        id: PromptId,
        vars: &HashMap<&str, &str>,
    ) -> Result<(String, String)> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(id)?;
        Ok((template.render_system(vars), template.render_user(vars)))
    }
}

#[async_trait]
impl ExtractionBackend for OpenAICompatibleBackend {
    async fn extract_document(
        &self,
        image_data: &[u8],
        kind: DocumentKind,
    ) -> Result<ExtractionResult> {
        let today = chrono::Utc::now().date_naive().to_string();
        let mut vars = HashMap::new();
        vars.insert("today", today.as_str());
        let (system, user) = self.render_prompt(PromptId::ExtractDocument, &vars)?;

        let base64_image = base64::engine::general_purpose::STANDARD.encode(image_data);
        let data_uri = format!("data:{};base64,{}", kind.mime_type(), base64_image);

        let messages = vec![
            WireMessage::system(system),
            WireMessage {
                role: "user".to_string(),
                content: WireContent::Parts(vec![
                    ContentPart::Text { text: user },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_uri },
                    },
                ]),
            },
        ];

        let response = self.completion(messages, Some(4096)).await?;
        debug!(kind = kind.as_str(), "Extraction response: {}", response);

        parse_extraction(&response)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let vars = HashMap::new();
        let (mut system, _) = self.render_prompt(PromptId::ChatAssistant, &vars)?;
        for block in &request.context {
            system.push_str("\n\n");
            system.push_str(block);
        }

        let mut messages = vec![WireMessage::system(system)];
        for turn in &request.turns {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            let content = match &turn.image {
                Some(image) => {
                    let base64_image =
                        base64::engine::general_purpose::STANDARD.encode(&image.data);
                    WireContent::Parts(vec![
                        ContentPart::Text {
                            text: turn.text.clone(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:{};base64,{}", image.mime_type, base64_image),
                            },
                        },
                    ])
                }
                None => WireContent::Text(turn.text.clone()),
            };
            messages.push(WireMessage {
                role: role.to_string(),
                content,
            });
        }

        let response = self.completion(messages, Some(1024)).await?;
        debug!("Chat response: {}", response);

        parse_chat_reply(&response)
    }

    async fn generate_insights(&self, transactions_json: &str) -> Result<Vec<String>> {
        let mut vars = HashMap::new();
        vars.insert("transactions", transactions_json);
        let (system, user) = self.render_prompt(PromptId::GenerateInsights, &vars)?;

        let messages = vec![WireMessage::system(system), WireMessage::user(user)];

        let response = self.completion(messages, Some(512)).await?;
        debug!("Insight response: {}", response);

        parse_insights(&response)
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .timeout(self.timeout);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        match req_builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Wire-format chat message
#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: WireContent,
}

impl WireMessage {
    fn system(text: String) -> Self {
        Self {
            role: "system".to_string(),
            content: WireContent::Text(text),
        }
    }

    fn user(text: String) -> Self {
        Self {
            role: "user".to_string(),
            content: WireContent::Text(text),
        }
    }
}

/// Message content (text or multimodal)
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Content part for multimodal messages
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image URL for vision requests
#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}
