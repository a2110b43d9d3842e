// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use futures::future::BoxFuture;

use crate::document::DocumentTree;
use crate::llm::ChatResult;

const SEPARATOR: &str = "\n\n";

/// Concatenate the text of `id` and all of its descendants, separated by blank lines.
///
/// `include_root` controls whether the text of `id` itself is part of the
/// result; descendants always contribute their own text. A block without
/// children always yields its own text.
pub fn summarize<'a, T>(
    tree: &'a T,
    id: &'a str,
    include_root: bool,
) -> BoxFuture<'a, ChatResult<String>>
where
    T: DocumentTree + ?Sized,
{
    Box::pin(async move {
        let node = tree.get_node(id).await?;
        if node.children.is_empty() {
            return Ok(node.content);
        }

        let mut parts = Vec::with_capacity(node.children.len() + 1);
        if include_root {
            parts.push(node.content);
        }
        for child in &node.children {
            parts.push(summarize(tree, child, true).await?);
        }

        Ok(parts.join(SEPARATOR))
    })
}
