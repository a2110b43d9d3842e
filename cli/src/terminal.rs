// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use blockgpt_core::document::{DocumentSink, DocumentTree, MemoryDocument, Node, Notifier};
use blockgpt_core::llm::{ChatError, ChatResult};
use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::Mutex;

/// What still has to be printed to turn `shown` into `next`.
///
/// A growing text only prints its new suffix; any other change starts a fresh line.
pub fn render_update(shown: &str, next: &str) -> String {
    if let Some(suffix) = next.strip_prefix(shown) {
        suffix.to_string()
    } else if shown.is_empty() {
        next.to_string()
    } else {
        format!("\n{}", next)
    }
}

/// Host that keeps the document in memory and echoes block writes to stdout.
pub struct TerminalHost {
    document: MemoryDocument,
    // (block id, text already on screen)
    shown: Mutex<Option<(String, String)>>,
}

impl TerminalHost {
    pub fn new(document: MemoryDocument) -> Self {
        Self {
            document,
            shown: Mutex::new(None),
        }
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    fn print(&self, text: &str) -> ChatResult<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| ChatError::HostWriteError(e.to_string()))
    }
}

#[async_trait]
impl DocumentTree for TerminalHost {
    async fn get_node(&self, id: &str) -> ChatResult<Node> {
        self.document.get_node(id).await
    }
}

#[async_trait]
impl DocumentSink for TerminalHost {
    async fn insert_node(&self, parent_id: &str, text: &str) -> ChatResult<Option<String>> {
        self.document.insert_node(parent_id, text).await
    }

    async fn update_node(&self, id: &str, text: &str) -> ChatResult<()> {
        self.document.update_node(id, text).await?;

        let output = {
            let mut shown = self
                .shown
                .lock()
                .map_err(|_| ChatError::HostWriteError("terminal state is poisoned".to_string()))?;
            let previous = match shown.as_ref() {
                Some((shown_id, shown_text)) if shown_id == id => shown_text.as_str(),
                _ => "",
            };
            let output = render_update(previous, text);
            *shown = Some((id.to_string(), text.to_string()));
            output
        };

        self.print(&output)
    }

    async fn focus_node(&self, id: &str) -> ChatResult<()> {
        self.document.focus_node(id).await?;

        let had_output = self
            .shown
            .lock()
            .map(|mut shown| shown.take().is_some())
            .unwrap_or(false);
        if had_output {
            self.print("\n")?;
        }
        Ok(())
    }
}

impl Notifier for TerminalHost {
    fn show_error(&self, message: &str) {
        self.document.show_error(message);
        eprintln!("{} {}", "❌ Error:".red().bold(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_update() {
        assert_eq!(render_update("", "Hello"), "Hello");
        assert_eq!(render_update("Hello", "Hello, world"), ", world");
        assert_eq!(render_update("Hello", "Hello"), "");
        assert_eq!(render_update("Hello", "Bye"), "\nBye");
    }

    #[tokio::test]
    async fn test_writes_reach_the_document() {
        let document = MemoryDocument::new();
        let root = document.add_root("question");
        let host = TerminalHost::new(document);

        let id = host.insert_node(&root, "loading...").await.unwrap().unwrap();
        host.update_node(&id, "answer").await.unwrap();
        host.focus_node(&root).await.unwrap();

        assert_eq!(host.document().content(&id).as_deref(), Some("answer"));
        assert_eq!(host.document().focused(), Some(root));
    }
}
