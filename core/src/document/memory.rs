// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::document::{DocumentSink, DocumentTree, Node, Notifier};
use crate::llm::{ChatError, ChatResult};

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    roots: Vec<String>,
    next_id: u64,
    updates: Vec<(String, String)>,
    focused: Option<String>,
    errors: Vec<String>,
}

impl State {
    fn allocate(&mut self, content: &str) -> String {
        self.next_id += 1;
        let id = format!("block-{}", self.next_id);
        self.nodes.insert(
            id.clone(),
            Node {
                content: content.to_string(),
                children: Vec::new(),
            },
        );
        id
    }

    fn add_child(&mut self, parent_id: &str, content: &str) -> ChatResult<String> {
        if !self.nodes.contains_key(parent_id) {
            return Err(ChatError::HostWriteError(format!(
                "parent block not found: {}",
                parent_id
            )));
        }
        let id = self.allocate(content);
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(id.clone());
        }
        Ok(id)
    }
}

/// In-memory document tree that records every write and notification.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    state: Mutex<State>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ChatResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| ChatError::HostWriteError("document state is poisoned".to_string()))
    }

    // Inspection helpers below treat a poisoned lock as empty state.
    fn read(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a top-level block.
    pub fn add_root(&self, content: &str) -> String {
        let mut state = self.read();
        let id = state.allocate(content);
        state.roots.push(id.clone());
        id
    }

    /// Add a child block without recording it as a sink write.
    pub fn add_child(&self, parent_id: &str, content: &str) -> ChatResult<String> {
        self.lock()?.add_child(parent_id, content)
    }

    pub fn roots(&self) -> Vec<String> {
        self.read().roots.clone()
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.read().nodes.get(id).map(|node| node.content.clone())
    }

    pub fn children(&self, id: &str) -> Vec<String> {
        self.read()
            .nodes
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Every `update_node` call in order, as `(id, text)`.
    pub fn updates(&self) -> Vec<(String, String)> {
        self.read().updates.clone()
    }

    pub fn focused(&self) -> Option<String> {
        self.read().focused.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.read().errors.clone()
    }
}

#[async_trait]
impl DocumentTree for MemoryDocument {
    async fn get_node(&self, id: &str) -> ChatResult<Node> {
        self.lock()?
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::HostWriteError(format!("block not found: {}", id)))
    }
}

#[async_trait]
impl DocumentSink for MemoryDocument {
    async fn insert_node(&self, parent_id: &str, text: &str) -> ChatResult<Option<String>> {
        self.lock()?.add_child(parent_id, text).map(Some)
    }

    async fn update_node(&self, id: &str, text: &str) -> ChatResult<()> {
        let mut state = self.lock()?;
        let node = state
            .nodes
            .get_mut(id)
            .ok_or_else(|| ChatError::HostWriteError(format!("block not found: {}", id)))?;
        node.content = text.to_string();
        state.updates.push((id.to_string(), text.to_string()));
        Ok(())
    }

    async fn focus_node(&self, id: &str) -> ChatResult<()> {
        let mut state = self.lock()?;
        if !state.nodes.contains_key(id) {
            return Err(ChatError::HostWriteError(format!("block not found: {}", id)));
        }
        state.focused = Some(id.to_string());
        Ok(())
    }
}

impl Notifier for MemoryDocument {
    fn show_error(&self, message: &str) {
        self.read().errors.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_update_focus() {
        let doc = MemoryDocument::new();
        let root = doc.add_root("page");

        let id = doc.insert_node(&root, "loading...").await.unwrap().unwrap();
        assert_eq!(doc.children(&root), vec![id.clone()]);
        assert_eq!(doc.content(&id).as_deref(), Some("loading..."));

        doc.update_node(&id, "done").await.unwrap();
        doc.focus_node(&root).await.unwrap();

        assert_eq!(doc.content(&id).as_deref(), Some("done"));
        assert_eq!(doc.updates(), vec![(id, "done".to_string())]);
        assert_eq!(doc.focused(), Some(root));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_host_write_errors() {
        let doc = MemoryDocument::new();

        let err = doc.insert_node("missing", "x").await.unwrap_err();
        assert!(matches!(err, ChatError::HostWriteError(_)));
        assert!(doc.update_node("missing", "x").await.is_err());
        assert!(doc.focus_node("missing").await.is_err());
        assert!(doc.get_node("missing").await.is_err());
    }

    #[test]
    fn test_notifications_are_recorded() {
        let doc = MemoryDocument::new();
        doc.show_error("boom");
        assert_eq!(doc.errors(), vec!["boom".to_string()]);
    }
}
