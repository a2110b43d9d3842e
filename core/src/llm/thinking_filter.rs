// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use regex::Regex;

/// Tag spellings that mark a reasoning span. They are aliases of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningTag {
    Thinking,
    Think,
}

impl ReasoningTag {
    /// Checked in this order.
    pub const ALL: [ReasoningTag; 2] = [ReasoningTag::Thinking, ReasoningTag::Think];

    pub fn open(&self) -> &'static str {
        match self {
            ReasoningTag::Thinking => "<thinking>",
            ReasoningTag::Think => "<think>",
        }
    }

    pub fn close(&self) -> &'static str {
        match self {
            ReasoningTag::Thinking => "</thinking>",
            ReasoningTag::Think => "</think>",
        }
    }

    fn pattern(&self) -> String {
        format!(
            "(?s){}.*?{}",
            regex::escape(self.open()),
            regex::escape(self.close())
        )
    }
}

static SPAN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ReasoningTag::ALL
        .iter()
        .filter_map(|tag| Regex::new(&tag.pattern()).ok())
        .collect()
});

/// Remove every closed reasoning span from a finished answer and trim the result.
///
/// Spans are matched non-greedily across line breaks. An opening tag without
/// a closing tag is left as it is. Applying the filter twice gives the same
/// result as applying it once.
pub fn filter_thinking_content(content: &str) -> String {
    let mut filtered = content.to_string();

    // Removing one span can join the halves of another; repeat until nothing matches.
    loop {
        let before = filtered.len();
        for pattern in SPAN_PATTERNS.iter() {
            filtered = pattern.replace_all(&filtered, "").into_owned();
        }
        if filtered.len() == before {
            break;
        }
    }

    filtered.trim().to_string()
}
