// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod prompts;
pub mod schema;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use yaml_rust::{Yaml, YamlLoader};

pub use prompts::PromptTemplates;
pub use schema::{
    model_choices, settings_schema, EnglishCatalog, MessageCatalog, SettingField, SettingKind,
    DEFAULT_MODELS,
};

pub const DEFAULT_ADDRESS: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Config errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ConfigError {
    #[error("Failed to load file: {0}")]
    LoadFileError(String),

    #[error("OpenAI API key is not set, please configure it in the settings")]
    MissingApiKey,

    #[error("OpenAI API key contains characters that cannot be sent in a header")]
    InvalidApiKey,

    #[error("OpenAI address is not set, please configure it in the settings")]
    MissingAddress,

    #[error("Invalid OpenAI address: {0}")]
    InvalidAddress(String),
}

/// Settings snapshot for a single chat operation.
///
/// Loaded once per operation and passed by reference into every entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub openai_key: String,
    pub openai_address: String,
    pub gpt_model: String,
    /// User override for the advanced-query system prompt. Empty means "use the bundled one".
    pub prompt_advanced_query: String,
    pub is_streaming_output: bool,
    pub is_hide_thinking: bool,
    pub is_text_query: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_key: String::new(),
            openai_address: DEFAULT_ADDRESS.to_string(),
            gpt_model: DEFAULT_MODEL.to_string(),
            prompt_advanced_query: String::new(),
            is_streaming_output: true,
            is_hide_thinking: false,
            is_text_query: false,
        }
    }
}

fn get_str_value_or_none_from_yaml(item: &Yaml, key: &str) -> Option<String> {
    item[key].as_str().map(|value| value.to_string())
}

fn get_bool_value_or_none_from_yaml(item: &Yaml, key: &str) -> Option<bool> {
    item[key].as_bool()
}

impl Settings {
    pub fn new(openai_key: String, openai_address: String, gpt_model: String) -> Self {
        Self {
            openai_key,
            openai_address,
            gpt_model,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, openai_key: String) -> Self {
        self.openai_key = openai_key;
        self
    }

    pub fn with_address(mut self, openai_address: String) -> Self {
        self.openai_address = openai_address;
        self
    }

    pub fn with_model(mut self, gpt_model: String) -> Self {
        self.gpt_model = gpt_model;
        self
    }

    pub fn with_advanced_query_prompt(mut self, prompt: String) -> Self {
        self.prompt_advanced_query = prompt;
        self
    }

    pub fn with_streaming_output(mut self, enabled: bool) -> Self {
        self.is_streaming_output = enabled;
        self
    }

    pub fn with_hide_thinking(mut self, enabled: bool) -> Self {
        self.is_hide_thinking = enabled;
        self
    }

    pub fn with_text_query(mut self, enabled: bool) -> Self {
        self.is_text_query = enabled;
        self
    }

    pub fn from_yaml(path: &str) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::LoadFileError(path.to_string()))?;
        Self::from_yaml_str(&source)
    }

    /// Parse settings from YAML. Keys match the settings schema; absent keys keep their defaults.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(source)
            .map_err(|e| ConfigError::LoadFileError(e.to_string()))?;

        let defaults = Self::default();
        let Some(doc) = docs.first() else {
            return Ok(defaults);
        };
        if doc.is_null() {
            return Ok(defaults);
        }
        if doc.as_hash().is_none() {
            return Err(ConfigError::LoadFileError(
                "settings document must be a mapping".to_string(),
            ));
        }

        Ok(Self {
            openai_key: get_str_value_or_none_from_yaml(doc, "openaiKey")
                .unwrap_or(defaults.openai_key),
            openai_address: get_str_value_or_none_from_yaml(doc, "openaiAddress")
                .unwrap_or(defaults.openai_address),
            gpt_model: get_str_value_or_none_from_yaml(doc, "GPTModel")
                .unwrap_or(defaults.gpt_model),
            prompt_advanced_query: get_str_value_or_none_from_yaml(doc, "generateAdvancedQuery")
                .unwrap_or(defaults.prompt_advanced_query),
            is_streaming_output: get_bool_value_or_none_from_yaml(doc, "isStreamingOutput")
                .unwrap_or(defaults.is_streaming_output),
            is_hide_thinking: get_bool_value_or_none_from_yaml(doc, "isHideThinking")
                .unwrap_or(defaults.is_hide_thinking),
            is_text_query: get_bool_value_or_none_from_yaml(doc, "isTextQuery")
                .unwrap_or(defaults.is_text_query),
        })
    }

    /// Fail fast on settings that would make any request pointless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.openai_address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        let url = Url::parse(self.openai_address.trim())
            .map_err(|e| ConfigError::InvalidAddress(format!("{}: {}", self.openai_address, e)))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidAddress(self.openai_address.clone()));
        }
        Ok(())
    }

    pub fn advanced_query_prompt<'a>(&'a self, templates: &'a PromptTemplates) -> &'a str {
        if self.prompt_advanced_query.replace(' ', "").is_empty() {
            &templates.advanced_query
        } else {
            &self.prompt_advanced_query
        }
    }

    fn base_address(&self) -> &str {
        self.openai_address.trim().trim_end_matches('/')
    }

    pub fn chat_endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_address())
    }

    pub fn models_endpoint(&self) -> String {
        format!("{}/v1/models", self.base_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_yaml_content() -> String {
        r#"
openaiKey: sk-test
openaiAddress: https://llm.example.com/
GPTModel: gpt-4
isStreamingOutput: false
isHideThinking: true
generateAdvancedQuery: "  "
"#
        .trim()
        .to_string()
    }

    #[test]
    fn test_settings_from_yaml_success() {
        let settings = Settings::from_yaml_str(&create_test_yaml_content())
            .expect("Failed to load settings");

        assert_eq!(settings.openai_key, "sk-test");
        assert_eq!(settings.openai_address, "https://llm.example.com/");
        assert_eq!(settings.gpt_model, "gpt-4");
        assert!(!settings.is_streaming_output);
        assert!(settings.is_hide_thinking);
        assert!(!settings.is_text_query);
        assert_eq!(settings.prompt_advanced_query, "  ");
    }

    #[test]
    fn test_settings_from_yaml_keeps_defaults() {
        let settings = Settings::from_yaml_str("openaiKey: abc").unwrap();
        assert_eq!(settings.openai_key, "abc");
        assert_eq!(settings.openai_address, DEFAULT_ADDRESS);
        assert_eq!(settings.gpt_model, DEFAULT_MODEL);
        assert!(settings.is_streaming_output);

        assert_eq!(Settings::from_yaml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_settings_from_yaml_rejects_non_mapping() {
        let result = Settings::from_yaml_str("- a\n- b");
        assert!(matches!(result, Err(ConfigError::LoadFileError(_))));
    }

    #[test]
    fn test_settings_from_yaml_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(create_test_yaml_content().as_bytes()).unwrap();
        file.flush().unwrap();

        let settings = Settings::from_yaml(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.gpt_model, "gpt-4");
    }

    #[test]
    fn test_settings_from_yaml_file_not_found() {
        let result = Settings::from_yaml("/non/existent/path/blockgpt.yaml");
        assert_eq!(
            result.unwrap_err(),
            ConfigError::LoadFileError("/non/existent/path/blockgpt.yaml".to_string())
        );
    }

    #[test]
    fn test_validate() {
        let settings = Settings::default();
        assert_eq!(settings.validate(), Err(ConfigError::MissingApiKey));

        let settings = Settings::default().with_api_key("   ".to_string());
        assert_eq!(settings.validate(), Err(ConfigError::MissingApiKey));

        let settings = Settings::default()
            .with_api_key("key".to_string())
            .with_address(String::new());
        assert_eq!(settings.validate(), Err(ConfigError::MissingAddress));

        let settings = Settings::default()
            .with_api_key("key".to_string())
            .with_address("not a url".to_string());
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidAddress(_))
        ));

        let settings = Settings::default().with_api_key("key".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_endpoints_ignore_trailing_slash() {
        let settings = Settings::default().with_address("http://localhost:8080/".to_string());
        assert_eq!(
            settings.chat_endpoint(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(settings.models_endpoint(), "http://localhost:8080/v1/models");
    }

    #[test]
    fn test_advanced_query_prompt_falls_back_to_template() {
        let templates = PromptTemplates {
            advanced_query: "bundled".to_string(),
        };

        let settings = Settings::default().with_advanced_query_prompt(" ".to_string());
        assert_eq!(settings.advanced_query_prompt(&templates), "bundled");

        let settings = Settings::default().with_advanced_query_prompt("custom".to_string());
        assert_eq!(settings.advanced_query_prompt(&templates), "custom");
    }
}
