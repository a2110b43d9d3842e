// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod chat_client;
pub mod error;
pub mod message;
pub mod stream_decoder;
pub mod thinking_filter;

pub use chat_client::{ByteStream, ChatClient, ChatOutput, ChatRequest};
pub use error::{ChatError, ChatResult};
pub use message::{to_messages, Message, MessageOptions, MessageRole};
pub use stream_decoder::{decode_stream, parse_line, Delta, ParseError, StreamDecoder};
pub use thinking_filter::{filter_thinking_content, ReasoningTag};
