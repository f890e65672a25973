//! `neu`, the terminal front end of neumann.

#[macro_use]
extern crate tracing;

mod cli;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use neumann::SessionBuilder;
use neumann::core::Command;
use neumann_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Console, ConsoleApprover, Renderer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cwd = env::current_dir()
        .context("failed to resolve the working directory")?
        .display()
        .to_string();

    let mut config = OpenAIConfigBuilder::new()
        .with_endpoint(&args.api_url)
        .with_model(&args.model)
        .with_raw_events(args.raw);
    if let Some(api_key) = &args.api_key {
        config = config.with_api_key(api_key);
    }
    let model_provider = OpenAIProvider::new(config.build());
    debug!("provider config: {:?}", model_provider.config());

    let console = Arc::new(Console::new());
    let renderer = Arc::new(Renderer::new());

    let mut builder = SessionBuilder::with_model_provider(model_provider)
        .with_tool_timeout(Duration::from_secs(args.tool_timeout))
        .with_native_tools(args.native_tools)
        .with_approval_handler(ConsoleApprover::new(console.clone()))
        .on_shell_output({
            let renderer = renderer.clone();
            move |line| renderer.shell_line(line)
        })
        .on_event({
            let renderer = renderer.clone();
            move |event| renderer.handle(event)
        });
    if let Some(system) = args.system {
        builder = builder.with_system_prompt(system);
    }
    if let Some(tool_dir) = &args.tool_dir {
        builder = builder.with_tool_dir(tool_dir);
    }
    let mut session = builder.build();

    renderer.banner(&cwd);
    if let (Some(discovery), Some(tool_dir)) = (session.discovery(), &args.tool_dir)
    {
        renderer.discovery(discovery, &tool_dir.display().to_string());
    }

    while let Some(line) = console.read_line(renderer.prompt()).await {
        match Command::parse(&line) {
            None => continue,
            Some(Command::Exit) => break,
            Some(Command::Reset) => {
                session.reset();
                renderer.banner(&cwd);
            }
            Some(Command::Message(message)) => {
                renderer.separator();
                if let Err(err) = session.send_message(&message).await {
                    renderer.turn_error(&err);
                }
            }
        }
    }
    Ok(())
}
