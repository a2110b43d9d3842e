// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! User-triggered operations.
//!
//! Each command validates its settings, inserts a placeholder block under the
//! target block, writes the answer into it, and focuses the target block.
//! Errors bubble up to [`report`], the single place they reach the user.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{PromptTemplates, Settings};
use crate::document::{DocumentSink, Notifier};
use crate::llm::{
    decode_stream, filter_thinking_content, to_messages, ChatClient, ChatResult, MessageOptions,
};

pub const PLACEHOLDER: &str = "loading...";

const CODE_ONLY_SUFFIX: &str = "(output the code text only without additional explanations.)";

static CODE_FENCE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^`{3,}|`{3,}$").ok());

/// Stream the answer into a new child of `block_id`.
///
/// With `is_hide_thinking` set the answer is fetched in one piece instead, so
/// reasoning spans can be removed before anything is written.
pub async fn openai_stream<K>(
    settings: &Settings,
    sink: &K,
    block_id: &str,
    user_content: &str,
    options: &MessageOptions,
) -> ChatResult<()>
where
    K: DocumentSink + ?Sized,
{
    let client = ChatClient::new(settings)?;
    let placeholder = sink.insert_node(block_id, PLACEHOLDER).await?;
    let messages = to_messages(user_content, options);

    if settings.is_hide_thinking {
        let result = client.chat(messages).await?;
        write_result(sink, block_id, placeholder.as_deref(), &filter_thinking_content(&result))
            .await?;
    } else {
        info!("Streaming answer from {}", client.model());
        let stream = client.chat_stream(messages).await?;
        let result = decode_stream(stream, sink, placeholder.as_deref()).await?;
        if placeholder.is_none() {
            sink.insert_node(block_id, &result).await?;
        }
    }

    sink.focus_node(block_id).await
}

/// Fetch the whole answer, then write it into a new child of `block_id`.
pub async fn openai_message<K>(
    settings: &Settings,
    sink: &K,
    block_id: &str,
    user_content: &str,
    options: &MessageOptions,
) -> ChatResult<()>
where
    K: DocumentSink + ?Sized,
{
    let client = ChatClient::new(settings)?;
    let placeholder = sink.insert_node(block_id, PLACEHOLDER).await?;

    info!("Requesting answer from {}", client.model());
    let result = client.chat(to_messages(user_content, options)).await?;
    let result = if settings.is_hide_thinking {
        filter_thinking_content(&result)
    } else {
        result
    };

    write_result(sink, block_id, placeholder.as_deref(), &result).await?;
    sink.focus_node(block_id).await
}

/// Streaming or buffered, as the settings ask.
pub async fn run_chat<K>(
    settings: &Settings,
    sink: &K,
    block_id: &str,
    user_content: &str,
    options: &MessageOptions,
) -> ChatResult<()>
where
    K: DocumentSink + ?Sized,
{
    if settings.is_streaming_output {
        openai_stream(settings, sink, block_id, user_content, options).await
    } else {
        openai_message(settings, sink, block_id, user_content, options).await
    }
}

/// Turn a natural-language request into an advanced query and write it under `block_id`.
pub async fn generate_advanced_query<K>(
    settings: &Settings,
    templates: &PromptTemplates,
    sink: &K,
    block_id: &str,
    content: &str,
) -> ChatResult<()>
where
    K: DocumentSink + ?Sized,
{
    let client = ChatClient::new(settings)?;
    let Some(placeholder) = sink.insert_node(block_id, PLACEHOLDER).await? else {
        debug!("Host returned no placeholder block, skipping advanced query");
        return Ok(());
    };

    let options = MessageOptions::default().with_system(settings.advanced_query_prompt(templates));
    let user_content = format!("{}{}", content, CODE_ONLY_SUFFIX);
    let result = client.chat(to_messages(&user_content, &options)).await?;
    let result = if settings.is_hide_thinking {
        filter_thinking_content(&result)
    } else {
        result
    };

    sink.update_node(&placeholder, &strip_code_fence(&result)).await?;
    sink.focus_node(block_id).await
}

/// Outermost boundary of a command: an error is shown once and swallowed.
pub fn report<N>(notifier: &N, result: ChatResult<()>) -> bool
where
    N: Notifier + ?Sized,
{
    match result {
        Ok(()) => true,
        Err(e) => {
            notifier.show_error(&e.to_string());
            false
        }
    }
}

async fn write_result<K>(
    sink: &K,
    block_id: &str,
    placeholder: Option<&str>,
    result: &str,
) -> ChatResult<()>
where
    K: DocumentSink + ?Sized,
{
    match placeholder {
        Some(id) => sink.update_node(id, result).await,
        None => sink.insert_node(block_id, result).await.map(|_| ()),
    }
}

/// Strip a leading and a trailing run of three or more backticks.
fn strip_code_fence(text: &str) -> String {
    match CODE_FENCE.as_ref() {
        Some(fence) => fence.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}
