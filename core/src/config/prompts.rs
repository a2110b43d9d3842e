// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use yaml_rust::YamlLoader;

use crate::config::ConfigError;

const BUNDLED_QUERY_PROMPTS: &str = include_str!("../../prompts/query.yaml");

/// Prompt templates shipped with the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    /// System prompt for the advanced-query command.
    pub advanced_query: String,
}

impl PromptTemplates {
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUNDLED_QUERY_PROMPTS)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(source)
            .map_err(|e| ConfigError::LoadFileError(e.to_string()))?;
        let doc = docs
            .first()
            .ok_or_else(|| ConfigError::LoadFileError("empty prompt template".to_string()))?;

        let advanced_query = doc["advanced_query"]["prompt"]
            .as_str()
            .map(|prompt| prompt.trim().to_string())
            .ok_or_else(|| {
                ConfigError::LoadFileError("missing advanced_query.prompt".to_string())
            })?;

        Ok(Self { advanced_query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_templates_load() {
        let templates = PromptTemplates::bundled().expect("bundled prompts must parse");
        assert!(templates.advanced_query.contains("advanced query"));
        assert!(!templates.advanced_query.ends_with('\n'));
    }

    #[test]
    fn test_missing_prompt() {
        let result = PromptTemplates::from_yaml_str("advanced_query:\n  title: x\n");
        assert!(matches!(result, Err(ConfigError::LoadFileError(_))));

        let result = PromptTemplates::from_yaml_str("");
        assert!(matches!(result, Err(ConfigError::LoadFileError(_))));
    }
}
