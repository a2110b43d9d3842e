// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Declarative settings surface exposed to the host editor.

use log::{debug, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{Settings, DEFAULT_ADDRESS, DEFAULT_MODEL};
use crate::llm::ChatClient;

/// Models offered when the provider cannot be asked.
pub const DEFAULT_MODELS: [&str; 6] = [
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-4",
    "gpt-4-32k",
    "gpt-3.5-turbo-0613",
    "gpt-4-0613",
];

/// Locale lookup for user-facing strings.
pub trait MessageCatalog: Send + Sync {
    fn message(&self, key: &str) -> String;
}

/// Built-in English messages. Unknown keys resolve to themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishCatalog;

impl MessageCatalog for EnglishCatalog {
    fn message(&self, key: &str) -> String {
        let text = match key {
            "openaiKey-description" => "Your OpenAI API key, sent as a bearer token.",
            "openaiAddress-description" => {
                "Base address of the OpenAI compatible API, without the /v1 suffix."
            }
            "GPTModel-description" => "Chat model used for completions.",
            "isStreamingOutput-description" => {
                "Write the answer into the block while it is being generated."
            }
            "isHideThinking-description" => {
                "Remove <think> and <thinking> sections from answers. Disables streaming."
            }
            "isTextQuery-description" => "Send the query as plain text.",
            _ => key,
        };
        text.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    String,
    Enum,
    Boolean,
    Heading,
}

/// One entry of the settings schema, serialized in the host's layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_choices: Vec<String>,
}

impl SettingField {
    fn new(
        catalog: &dyn MessageCatalog,
        key: &str,
        kind: SettingKind,
        default: Value,
        title: &str,
    ) -> Self {
        Self {
            key: Some(key.to_string()),
            kind,
            default: Some(default),
            title: title.to_string(),
            description: Some(catalog.message(&format!("{}-description", key))),
            enum_choices: Vec::new(),
        }
    }

    fn heading(title: &str) -> Self {
        Self {
            key: None,
            kind: SettingKind::Heading,
            default: None,
            title: title.to_string(),
            description: None,
            enum_choices: Vec::new(),
        }
    }

    fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.enum_choices = choices;
        self
    }
}

pub fn settings_schema(
    model_choices: Vec<String>,
    catalog: &dyn MessageCatalog,
) -> Vec<SettingField> {
    vec![
        SettingField::new(catalog, "openaiKey", SettingKind::String, json!(""), "OpenAI API Key"),
        SettingField::new(
            catalog,
            "openaiAddress",
            SettingKind::String,
            json!(DEFAULT_ADDRESS),
            "OpenAI Address",
        ),
        SettingField::new(
            catalog,
            "GPTModel",
            SettingKind::Enum,
            json!(DEFAULT_MODEL),
            "ChatGPT Models",
        )
        .with_choices(model_choices),
        SettingField::heading("Beta Features"),
        SettingField::new(
            catalog,
            "isStreamingOutput",
            SettingKind::Boolean,
            json!(true),
            "Streaming Output",
        ),
        SettingField::new(
            catalog,
            "isHideThinking",
            SettingKind::Boolean,
            json!(false),
            "Hide Thinking",
        ),
        SettingField::new(
            catalog,
            "isTextQuery",
            SettingKind::Boolean,
            json!(false),
            "Text Query",
        ),
    ]
}

/// Models for the model dropdown. Falls back to [`DEFAULT_MODELS`] on any failure.
pub async fn model_choices(settings: &Settings) -> Vec<String> {
    let fallback = || DEFAULT_MODELS.iter().map(|m| m.to_string()).collect::<Vec<_>>();

    if settings.openai_key.trim().is_empty() {
        debug!("No API key configured, using default model list");
        return fallback();
    }

    let client = match ChatClient::new(settings) {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to create chat client for model listing: {}", e);
            return fallback();
        }
    };

    match client.list_models().await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => fallback(),
        Err(e) => {
            warn!("Failed to fetch models from OpenAI API: {}", e);
            fallback()
        }
    }
}
