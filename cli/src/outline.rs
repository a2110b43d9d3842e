// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Markdown bullet outlines (`- item`, nested by indentation) as a block tree.

use anyhow::Result;
use blockgpt_core::document::MemoryDocument;

struct OutlineBlock {
    indent: usize,
    parent: Option<usize>,
    lines: Vec<String>,
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum()
}

fn bullet_text(trimmed: &str) -> Option<&str> {
    if trimmed == "-" || trimmed == "*" {
        return Some("");
    }
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
}

/// Build a page block titled `title` whose children are the outline's top-level bullets.
///
/// Non-bullet lines continue the previous block; lines before the first bullet
/// belong to the page block itself.
pub fn parse_outline(source: &str, title: &str) -> Result<(MemoryDocument, String)> {
    let mut page_lines = vec![title.to_string()];
    let mut blocks: Vec<OutlineBlock> = Vec::new();
    // indices into `blocks` of the currently open ancestors
    let mut stack: Vec<usize> = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(text) = bullet_text(trimmed) else {
            match blocks.last_mut() {
                Some(block) => block.lines.push(trimmed.to_string()),
                None => page_lines.push(trimmed.to_string()),
            }
            continue;
        };

        let indent = indent_width(line);
        while let Some(&top) = stack.last() {
            if blocks[top].indent >= indent {
                stack.pop();
            } else {
                break;
            }
        }

        blocks.push(OutlineBlock {
            indent,
            parent: stack.last().copied(),
            lines: vec![text.to_string()],
        });
        stack.push(blocks.len() - 1);
    }

    let document = MemoryDocument::new();
    let root = document.add_root(page_lines.join("\n").trim());

    let mut ids: Vec<String> = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let parent_id = match block.parent {
            Some(index) => ids[index].as_str(),
            None => root.as_str(),
        };
        let id = document.add_child(parent_id, &block.lines.join("\n"))?;
        ids.push(id);
    }

    Ok((document, root))
}
