// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod commands;
pub mod config;
pub mod document;
pub mod llm;

pub use commands::*;
pub use config::*;
pub use document::*;
pub use llm::*;
