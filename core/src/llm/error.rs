// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during a chat operation
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Non-2xx response, transport failure or an unreadable response body.
    #[error("{message}")]
    ApiError {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Failed to write to document: {0}")]
    HostWriteError(String),
}

impl ChatError {
    pub fn api(status_code: Option<u16>, message: impl Into<String>) -> Self {
        ChatError::ApiError {
            status_code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::ApiError {
            status_code: err.status().map(|s| s.as_u16()),
            message: format!("Network request failed: {}", err),
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
