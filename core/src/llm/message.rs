// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Assistant,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::Assistant => "assistant",
            MessageRole::User => "user",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A role-tagged chat message, serialized as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

/// Optional prompt parts that precede the user content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOptions {
    pub system: Option<String>,
    pub assistant: Option<String>,
}

impl MessageOptions {
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_assistant(mut self, assistant: impl Into<String>) -> Self {
        self.assistant = Some(assistant.into());
        self
    }
}

/// Build the ordered message list: system, assistant, then user.
///
/// Optional parts that are absent or empty are left out. The user message is always present.
pub fn to_messages(user_content: &str, options: &MessageOptions) -> Vec<Message> {
    let mut messages = Vec::with_capacity(3);

    if let Some(system) = options.system.as_deref().filter(|s| !s.is_empty()) {
        messages.push(Message::system(system));
    }
    if let Some(assistant) = options.assistant.as_deref().filter(|s| !s.is_empty()) {
        messages.push(Message::assistant(assistant));
    }
    messages.push(Message::user(user_content));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_only() {
        let messages = to_messages("hello", &MessageOptions::default());
        assert_eq!(messages, vec![Message::user("hello")]);
    }

    #[test]
    fn test_full_ordering() {
        let options = MessageOptions::default()
            .with_assistant("previous answer")
            .with_system("be brief");
        let messages = to_messages("question", &options);

        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::Assistant, MessageRole::User]
        );
        assert_eq!(messages[0].content, "be brief");
        assert_eq!(messages[2].content, "question");
    }

    #[test]
    fn test_empty_parts_are_omitted() {
        let options = MessageOptions::default().with_system("").with_assistant("");
        let messages = to_messages("q", &options);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);

        let messages = to_messages("", &MessageOptions::default());
        assert_eq!(messages, vec![Message::user("")]);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Message::system("s")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"s"}"#);
    }
}
