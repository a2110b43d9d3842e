// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Boundary to the host editor's document tree.

pub mod memory;
pub mod summary;

use async_trait::async_trait;

use crate::llm::ChatResult;

pub use memory::MemoryDocument;
pub use summary::summarize;

/// Read-only view of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub content: String,
    /// Child ids in the order the host returns them.
    pub children: Vec<String>,
}

#[async_trait]
pub trait DocumentTree: Send + Sync {
    async fn get_node(&self, id: &str) -> ChatResult<Node>;
}

#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Insert a child block under `parent_id`. Some hosts cannot report the new id.
    async fn insert_node(&self, parent_id: &str, text: &str) -> ChatResult<Option<String>>;

    async fn update_node(&self, id: &str, text: &str) -> ChatResult<()>;

    async fn focus_node(&self, id: &str) -> ChatResult<()>;
}

/// Transient user-visible messages.
pub trait Notifier: Send + Sync {
    fn show_error(&self, message: &str);
}
