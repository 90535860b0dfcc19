//! Built-in demo tools for the weather-forecaster agent.
//!
//! - `UserLocationTool` (`get_user_location`): no arguments, returns a configured location
//! - `WeatherTool` (`get_weather_for_location`): `{city}`, rain or sun from a `SkySampler`

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tool::Tool;

/// Location returned when none is configured.
pub const DEFAULT_LOCATION: &str = "Florida";

/// Returns the user's location. Takes no arguments.
#[derive(Debug, Clone)]
pub struct UserLocationTool {
    location: String,
}

impl UserLocationTool {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl Default for UserLocationTool {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION)
    }
}

#[async_trait]
impl Tool for UserLocationTool {
    fn name(&self) -> &str {
        "get_user_location"
    }

    fn description(&self) -> &str {
        "Retrieve the user's location"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(Value::String(self.location.clone()))
    }
}

/// Weather condition reported for a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sky {
    Rain,
    Sunny,
}

impl Sky {
    pub fn describe(self, city: &str) -> String {
        match self {
            Sky::Rain => format!("It looks like rain in {city}!"),
            Sky::Sunny => format!("It's always sunny in {city}!"),
        }
    }
}

/// Source of weather outcomes.
pub trait SkySampler: Send + Sync {
    fn sample(&self) -> Sky;
}

/// Independent 50/50 draw per call from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoinFlip;

impl SkySampler for CoinFlip {
    fn sample(&self) -> Sky {
        if rand::thread_rng().gen_bool(0.5) {
            Sky::Rain
        } else {
            Sky::Sunny
        }
    }
}

/// 50/50 draws from a seeded RNG; the same seed gives the same sequence.
#[derive(Debug)]
pub struct Seeded {
    rng: Mutex<StdRng>,
}

impl Seeded {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SkySampler for Seeded {
    fn sample(&self) -> Sky {
        let rain = match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(0.5),
            Err(poisoned) => poisoned.into_inner().gen_bool(0.5),
        };
        if rain {
            Sky::Rain
        } else {
            Sky::Sunny
        }
    }
}

/// Always the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub Sky);

impl SkySampler for Fixed {
    fn sample(&self) -> Sky {
        self.0
    }
}

/// Reports rain or sun for a city.
pub struct WeatherTool {
    sampler: Box<dyn SkySampler>,
}

impl WeatherTool {
    pub fn new(sampler: impl SkySampler + 'static) -> Self {
        Self {
            sampler: Box::new(sampler),
        }
    }

    /// Reproducible forecasts when `seed` is set, coin flips otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(Seeded::new(seed)),
            None => Self::new(CoinFlip),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new(CoinFlip)
    }
}

impl std::fmt::Debug for WeatherTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather_for_location"
    }

    fn description(&self) -> &str {
        "Get the weather for a given city"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city to get the weather for",
                    "minLength": 1,
                    "pattern": "\\S"
                }
            },
            "required": ["city"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let city = args
            .get("city")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ToolError::ExecutionFailed("city must be a non-empty string".into()))?;
        Ok(Value::String(self.sampler.sample().describe(city)))
    }
}
