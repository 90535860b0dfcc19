//! Weather agent without a network: scripted model, real tools, in-memory thread.
//!
//! Run: `cargo run -p agentloop --example offline_weather`
//! Shows the tool round-trip (location, then forecast) and the resulting thread.

use std::sync::Arc;

use agentloop::prompts::WEATHER_SYSTEM_PROMPT;
use agentloop::tool::builtin::{Fixed, Sky, UserLocationTool, WeatherTool};
use agentloop::{
    ConversationStore, InMemoryStore, LlmResponse, Message, MockLlm, ToolCall, ToolRegistry,
    TurnController,
};
use serde_json::json;

#[tokio::main]
async fn main() {
    let llm = MockLlm::new(vec![
        LlmResponse::tool_requests(
            "",
            vec![ToolCall::new("call_0", "get_user_location", json!({}))],
        ),
        LlmResponse::tool_requests(
            "",
            vec![ToolCall::new(
                "call_1",
                "get_weather_for_location",
                json!({"city": "Florida"}),
            )],
        ),
        LlmResponse::final_text("Florida is sun-believably bright today. Shade yourself!"),
    ]);
    let tools = ToolRegistry::new()
        .with_tool(UserLocationTool::default())
        .with_tool(WeatherTool::new(Fixed(Sky::Sunny)));
    let store = Arc::new(InMemoryStore::new());
    let ctl = TurnController::new(
        Arc::new(llm),
        Arc::new(tools),
        store.clone(),
        WEATHER_SYSTEM_PROMPT,
    );

    let out = ctl
        .run_turn("offline", "What's the weather where I am?")
        .await
        .unwrap();
    println!("answer: {}", out.answer);
    println!("model calls: {}, tool calls: {}", out.model_calls, out.tool_calls);

    println!("\n=== thread ===");
    for m in store.load("offline").await.unwrap().messages {
        match &m {
            Message::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                for c in tool_calls {
                    println!("assistant -> {}({})", c.name, c.arguments_string());
                }
            }
            other => println!("{}: {}", other.role(), other.content()),
        }
    }
}
