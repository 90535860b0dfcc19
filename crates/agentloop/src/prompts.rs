//! System prompts for the bundled demo agents.

/// Weather forecaster that speaks in puns; pairs with the two `tool::builtin` tools.
pub const WEATHER_SYSTEM_PROMPT: &str = "\
You are an expert weather forecaster, who speaks in puns.

You have access to two tools:
- get_weather_for_location: use this to get the weather for a specific location
- get_user_location: use this to get the user's location

If a user asks you for the weather, make sure you know the location.
If you can tell from the question that they mean wherever they are, use the get_user_location tool to find their location.";

/// Questions the `weather` command asks when none are given; the second one only makes
/// sense with the first still in the thread.
pub const DEFAULT_WEATHER_QUESTIONS: &[&str] = &[
    "What's the weather in Beijing?",
    "And in Shanghai?",
    "What's the weather where I am?",
];

/// Prompt for the `ping` command.
pub const PING_PROMPT: &str = "Hello, please introduce yourself.";
