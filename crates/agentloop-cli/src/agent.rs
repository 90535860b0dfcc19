//! Wiring: config → model client, weather tools, store → `TurnController`.

use std::sync::Arc;

use anyhow::{Context, Result};

use agentloop::prompts::WEATHER_SYSTEM_PROMPT;
use agentloop::tool::builtin::{UserLocationTool, WeatherTool};
use agentloop::{AgentConfig, ChatOpenAI, InMemoryStore, ToolRegistry, TurnController};

/// Weather tools: `get_user_location` answering `location`, `get_weather_for_location`
/// seeded when `seed` is set.
pub fn weather_tools(location: &str, seed: Option<u64>) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(UserLocationTool::new(location))
        .with_tool(WeatherTool::from_seed(seed))
}

/// Builds the weather-forecaster controller over a fresh in-memory store.
pub fn weather_controller(
    cfg: &AgentConfig,
    location: &str,
    seed: Option<u64>,
) -> Result<TurnController> {
    let tools = weather_tools(location, seed);
    let openai = cfg.openai_config().context("model client config")?;
    let llm = ChatOpenAI::new(openai)
        .context("build model client")?
        .with_tools(tools.specs());
    tracing::info!(
        model = %cfg.model,
        base_url = %cfg.base_url,
        tools = ?tools.names(),
        "weather agent ready"
    );
    Ok(TurnController::new(
        Arc::new(llm),
        Arc::new(tools),
        Arc::new(InMemoryStore::new()),
        WEATHER_SYSTEM_PROMPT,
    )
    .with_options(cfg.turn_options()))
}
