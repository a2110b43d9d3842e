// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::config::{ConfigError, Settings};
use crate::llm::error::{ChatError, ChatResult};
use crate::llm::Message;

/// Raw response body of a streaming completion.
pub type ByteStream = Pin<Box<dyn Stream<Item = ChatResult<Bytes>> + Send>>;

/// Result of [`ChatClient::complete`].
pub enum ChatOutput {
    Text(String),
    Stream(ByteStream),
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Client for one OpenAI compatible chat-completion endpoint
pub struct ChatClient {
    client: Client,
    headers: HeaderMap,
    model: String,
    chat_endpoint: String,
    models_endpoint: String,
}

impl ChatClient {
    /// Validates `settings` before anything else, so a bad configuration never reaches the network.
    pub fn new(settings: &Settings) -> ChatResult<Self> {
        settings.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", settings.openai_key.trim())
                .parse::<HeaderValue>()
                .map_err(|_| ConfigError::InvalidApiKey)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Only the connect phase is bounded: streamed answers may legitimately take minutes.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(ChatError::from)?;

        Ok(Self {
            client,
            headers,
            model: settings.gpt_model.clone(),
            chat_endpoint: settings.chat_endpoint(),
            models_endpoint: settings.models_endpoint(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one completion request.
    ///
    /// `stream` selects between a buffered text result and the raw body.
    pub async fn complete(&self, messages: Vec<Message>, stream: bool) -> ChatResult<ChatOutput> {
        if stream {
            self.chat_stream(messages).await.map(ChatOutput::Stream)
        } else {
            self.chat(messages).await.map(ChatOutput::Text)
        }
    }

    /// Buffered completion: the first choice's message content.
    pub async fn chat(&self, messages: Vec<Message>) -> ChatResult<String> {
        let response = self.send(messages, false).await?;
        let body = response.text().await?;
        parse_completion(&body)
    }

    /// Streaming completion: the response body as it arrives.
    pub async fn chat_stream(&self, messages: Vec<Message>) -> ChatResult<ByteStream> {
        let response = self.send(messages, true).await?;
        let stream = response.bytes_stream().map(|chunk| chunk.map_err(ChatError::from));
        Ok(Box::pin(stream))
    }

    pub async fn list_models(&self) -> ChatResult<Vec<String>> {
        debug!("Listing models from {}", self.models_endpoint);

        let response = self
            .client
            .get(&self.models_endpoint)
            .headers(self.headers.clone())
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let models: ModelsResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::api(None, format!("Malformed models response: {}", e)))?;

        Ok(models.data.into_iter().map(|model| model.id).collect())
    }

    async fn send(&self, messages: Vec<Message>, stream: bool) -> ChatResult<Response> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
        };

        debug!(
            "POST {} (model: {}, messages: {}, stream: {})",
            self.chat_endpoint,
            request.model,
            request.messages.len(),
            request.stream
        );

        let response = self
            .client
            .post(&self.chat_endpoint)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: Response) -> ChatResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(ChatError::api(
        Some(status.as_u16()),
        error_message(status, &error_text),
    ))
}

/// Prefer the provider's `error.message`, then the raw body, then the status line.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(ErrorResponse {
        error: ErrorDetail {
            message: Some(message),
        },
    }) = serde_json::from_str::<ErrorResponse>(body)
    {
        if !message.is_empty() {
            return message;
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    format!("Request failed with status {}", status)
}

fn parse_completion(body: &str) -> ChatResult<String> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::api(None, format!("Malformed completion response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::api(None, "No choices in response"))?;

    Ok(choice.message.content.unwrap_or_default())
}
