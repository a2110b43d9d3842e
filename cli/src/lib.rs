// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod outline;
pub mod settings;
pub mod terminal;

pub use outline::parse_outline;
pub use settings::load_settings;
pub use terminal::TerminalHost;
