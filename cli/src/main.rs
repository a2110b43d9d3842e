// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use blockgpt_cli::{load_settings, parse_outline, TerminalHost};
use blockgpt_core::{
    commands::{generate_advanced_query, openai_message, report, run_chat},
    config::{model_choices, settings_schema, EnglishCatalog, PromptTemplates, Settings},
    document::{summarize, MemoryDocument},
    llm::MessageOptions,
};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "blockgpt",
    about = "BlockGPT - chat completions for outline documents",
    version = env!("CARGO_PKG_VERSION"),
    author = "ByteDance"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question, streaming or buffered as configured
    Chat(PromptArgs),
    /// Ask a question and wait for the whole answer
    Message(PromptArgs),
    /// Generate an advanced query from a natural-language request
    Query {
        text: String,
    },
    /// Flatten an outline file into text, optionally sending it as a question
    Summarize {
        /// Markdown outline made of `- ` bullets
        outline: PathBuf,

        /// Include the page title in the summary
        #[arg(long)]
        include_root: bool,

        /// Send the summary to the model and print the answer
        #[arg(long)]
        chat: bool,
    },
    /// List the models offered by the configured endpoint
    Models,
    /// Print the settings schema as JSON
    Schema,
}

#[derive(Args)]
struct PromptArgs {
    text: String,

    /// System message sent before the question
    #[arg(short, long)]
    system: Option<String>,

    /// Assistant message sent before the question
    #[arg(short, long)]
    assistant: Option<String>,
}

impl PromptArgs {
    fn options(&self) -> MessageOptions {
        let mut options = MessageOptions::default();
        if let Some(system) = &self.system {
            options = options.with_system(system.clone());
        }
        if let Some(assistant) = &self.assistant {
            options = options.with_assistant(assistant.clone());
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let settings = load_settings(cli.config.as_deref())?;

    let succeeded = match cli.command {
        Command::Chat(args) => handle_chat(&settings, &args, true).await,
        Command::Message(args) => handle_chat(&settings, &args, false).await,
        Command::Query { text } => handle_query(&settings, &text).await?,
        Command::Summarize {
            outline,
            include_root,
            chat,
        } => handle_summarize(&settings, outline, include_root, chat).await?,
        Command::Models => {
            for model in model_choices(&settings).await {
                println!("{}", model);
            }
            true
        }
        Command::Schema => {
            let schema = settings_schema(model_choices(&settings).await, &EnglishCatalog);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            true
        }
    };

    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}

fn print_model(settings: &Settings) {
    println!(
        "🎯 Model: {} @ {}",
        settings.gpt_model.bright_yellow(),
        settings.openai_address.bright_blue()
    );
}

async fn handle_chat(settings: &Settings, args: &PromptArgs, follow_streaming: bool) -> bool {
    let document = MemoryDocument::new();
    let block = document.add_root(&args.text);
    let host = TerminalHost::new(document);
    let options = args.options();

    print_model(settings);
    let result = if follow_streaming {
        run_chat(settings, &host, &block, &args.text, &options).await
    } else {
        openai_message(settings, &host, &block, &args.text, &options).await
    };

    report(&host, result)
}

async fn handle_query(settings: &Settings, text: &str) -> Result<bool> {
    let templates = PromptTemplates::bundled()?;
    let document = MemoryDocument::new();
    let block = document.add_root(text);
    let host = TerminalHost::new(document);

    print_model(settings);
    let result = generate_advanced_query(settings, &templates, &host, &block, text).await;
    Ok(report(&host, result))
}

async fn handle_summarize(
    settings: &Settings,
    outline: PathBuf,
    include_root: bool,
    chat: bool,
) -> Result<bool> {
    let source = std::fs::read_to_string(&outline)
        .with_context(|| format!("Failed to read outline {}", outline.display()))?;
    let title = outline
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (document, root) = parse_outline(&source, &title)?;
    let host = TerminalHost::new(document);

    let summary = match summarize(&host, &root, include_root).await {
        Ok(summary) => summary,
        Err(e) => return Ok(report(&host, Err(e))),
    };

    if !chat {
        println!("{}", summary);
        return Ok(true);
    }

    print_model(settings);
    let result = run_chat(settings, &host, &root, &summary, &MessageOptions::default()).await;
    Ok(report(&host, result))
}
