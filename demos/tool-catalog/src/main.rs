//! Tool catalog demo: lists declared tools, calls them directly, or lets an
//! Ollama model call them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use agent_toolkit::adapters::{ChatMessage, ChatRequest, ModelAdapter};
use agent_toolkit::tools::{
    Receivers, SessionId, ToolExecutionRequest, ToolExecutor, ToolParam, ToolRegistry, TypeIndex,
    tools,
};
use agent_toolkit::{config, ollama_adapter, publish_declared_tools, telemetry};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;

const MAX_TOOL_ROUNDS: usize = 4;

#[derive(Parser, Debug)]
#[command(about = "Inspect and run the tools declared in this binary")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every published tool specification as JSON.
    List,
    /// Call a tool with JSON arguments.
    Call {
        /// Tool name.
        name: String,
        /// Arguments as a JSON object.
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Ask an Ollama model a question, letting it call the tools.
    Chat {
        /// The question.
        prompt: String,
    },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToolParam)]
#[serde(rename_all = "lowercase")]
#[tool_param(crate = "agent_toolkit::tools")]
enum Unit {
    Celsius,
    Fahrenheit,
}

struct Weather;

#[tools(crate = "agent_toolkit::tools")]
impl Weather {
    #[tool(description = "Returns the current temperature for a city")]
    fn temperature(
        &self,
        #[p(description = "City name")] city: String,
        #[p(description = "Unit of the result", required = false)] unit: Option<Unit>,
    ) -> String {
        let celsius = 18.5;
        match unit.unwrap_or(Unit::Celsius) {
            Unit::Celsius => format!("{city}: {celsius:.1} °C"),
            Unit::Fahrenheit => format!("{city}: {:.1} °F", celsius * 9.0 / 5.0 + 32.0),
        }
    }
}

struct Clock;

#[tools(crate = "agent_toolkit::tools")]
impl Clock {
    #[tool(description = "Seconds since the Unix epoch")]
    fn now(&self) -> anyhow::Result<u64> {
        Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
    }

    #[tool(non_blocking, description = "Waits before answering")]
    async fn delayed_echo(&self, text: String, millis: u64) -> String {
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        text
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;
    telemetry::init_tracing(&settings.telemetry.filter)?;

    let registry = publish_declared_tools(TypeIndex::new(), &settings.tools)?;
    info!(tools = registry.len(), "tool registry published");

    match cli.command {
        Command::List => list(&registry),
        Command::Call { name, arguments } => {
            let output = executor(registry)
                .execute(&ToolExecutionRequest::new(name, arguments), None)
                .await?;
            println!("{output}");
            Ok(())
        }
        Command::Chat { prompt } => chat(registry, &settings.ollama, prompt).await,
    }
}

fn executor(registry: ToolRegistry) -> ToolExecutor {
    let receivers = Receivers::new()
        .with(Arc::new(Weather))
        .with(Arc::new(Clock));
    ToolExecutor::new(registry, receivers)
}

fn list(registry: &ToolRegistry) -> Result<()> {
    for (owner, entry) in registry.entries() {
        println!("# {owner} ({:?})", entry.mode());
        let spec = serde_json::to_string_pretty(entry.descriptor())
            .context("failed to render tool specification")?;
        println!("{spec}");
    }
    Ok(())
}

async fn chat(
    registry: ToolRegistry,
    settings: &config::OllamaSettings,
    prompt: String,
) -> Result<()> {
    let adapter = ollama_adapter(settings)?;
    let tools: Vec<_> = registry.descriptors().into_iter().cloned().collect();
    let executor = executor(registry);
    let session = SessionId::random();

    let mut messages = vec![ChatMessage::user(prompt)];
    for round in 0..MAX_TOOL_ROUNDS {
        let request = ChatRequest::new(messages.clone())?.with_tools(tools.clone());
        let reply = adapter.chat(request).await?;
        if !reply.has_tool_execution_requests() {
            println!("{}", reply.text);
            return Ok(());
        }

        info!(round, calls = reply.tool_execution_requests.len(), "model requested tools");
        let calls = reply.tool_execution_requests.clone();
        messages.push(ChatMessage::Ai(reply));
        for call in &calls {
            let text = match executor.execute(call, Some(&session)).await {
                Ok(output) => output,
                Err(err) => format!("Error: {err}"),
            };
            messages.push(ChatMessage::tool_result(call, text));
        }
    }
    anyhow::bail!("model kept requesting tools after {MAX_TOOL_ROUNDS} rounds")
}
