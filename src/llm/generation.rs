// src/llm/generation.rs

//! Multimodal chat-completion client. Requests and responses are explicit
//! typed structs validated at the boundary; nothing loosely-typed crosses
//! into the rest of the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CONFIG;
use crate::error::GenerationError;
use crate::llm::retry::RetryPolicy;

/// Anything that can produce a tutor reply from persona + context + the
/// user's new message (optionally multimodal).
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        persona: &str,
        context: &str,
        user_text: &str,
        image_ref: Option<&str>,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

/// Plain text for system messages; content parts when an image rides along.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

pub struct GenerationClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl GenerationClient {
    pub fn new(retry: RetryPolicy) -> anyhow::Result<Self> {
        let api_key = std::env::var("TUTOR_API_KEY")
            .map_err(|_| anyhow::anyhow!("TUTOR_API_KEY not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CONFIG.generation_timeout))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: CONFIG.generation_model.clone(),
            timeout_secs: CONFIG.generation_timeout,
            retry,
        })
    }

    async fn generate_once(
        &self,
        persona: &str,
        context: &str,
        user_text: &str,
        image_ref: Option<&str>,
    ) -> Result<String, GenerationError> {
        // The image is passed by reference (an already-resolved URL), never
        // re-uploaded through this client.
        let user_content = match image_ref {
            Some(url) => MessageContent::Parts(vec![
                ContentPart::Text { text: user_text },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                },
            ]),
            None => MessageContent::Text(user_text),
        };

        let mut messages = vec![ChatMessage {
            role: "system",
            content: MessageContent::Text(persona),
        }];
        if !context.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(context),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_content,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: CONFIG.max_output_tokens,
            temperature: 0.7,
        };

        let resp = self
            .client
            .post(CONFIG.api_url("chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Upstream(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::RateLimited(text));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream(format!("{}: {}", status, text)));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::Malformed("response carried no reply text".into()))
    }
}

#[async_trait]
impl Generator for GenerationClient {
    async fn generate(
        &self,
        persona: &str,
        context: &str,
        user_text: &str,
        image_ref: Option<&str>,
    ) -> Result<String, GenerationError> {
        debug!(
            target: "generation",
            model = %self.model,
            multimodal = image_ref.is_some(),
            context_chars = context.len(),
            "requesting completion"
        );

        self.retry
            .run(
                "generation",
                || self.generate_once(persona, context, user_text, image_ref),
                GenerationError::is_retryable,
            )
            .await
    }
}
