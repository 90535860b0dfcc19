//! `agentloop`: demo front-end for the agent turn-loop.
//!
//! - `weather`: weather-forecaster agent, one turn per question on a shared thread
//! - `chat`: interactive loop on stdin (`/history`, `/resume`, `/quit`)
//! - `ping`: one model call without tools
//!
//! Settings come from the environment (and `.env`) via `AgentConfig::from_env`; flags override.

mod agent;
mod logging;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use agentloop::llm::invoke_with_retry;
use agentloop::prompts::{DEFAULT_WEATHER_QUESTIONS, PING_PROMPT};
use agentloop::tool::builtin::DEFAULT_LOCATION;
use agentloop::{
    AgentConfig, AgentError, ChatOpenAI, ConfigError, ConversationStore, LlmClient, Message,
    TurnController,
};

/// Temperature `ping` uses unless `--temperature` is given.
const PING_TEMPERATURE: f32 = 0.3;

#[derive(Parser)]
#[command(name = "agentloop")]
#[command(about = "Agent turn-loop demos over an OpenAI-compatible endpoint (Kimi by default)")]
struct Cli {
    /// Model id (env AGENT_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// API base URL (env KIMI_API_BASE / OPENAI_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Sampling temperature (env AGENT_TEMPERATURE)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Model calls allowed per turn, at least 1 (env AGENT_MAX_ITERATIONS)
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Response-length cap per model call (env AGENT_MAX_TOKENS)
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Seconds allowed per model attempt (env AGENT_MODEL_TIMEOUT_SECS)
    #[arg(long, global = true)]
    model_timeout_secs: Option<u64>,

    /// Seconds allowed per tool call (env AGENT_TOOL_TIMEOUT_SECS)
    #[arg(long, global = true)]
    tool_timeout_secs: Option<u64>,

    /// Retries for transport errors and 429/5xx (env AGENT_MAX_RETRIES)
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Location reported by get_user_location
    #[arg(long, global = true, default_value = DEFAULT_LOCATION)]
    location: String,

    /// Seed for reproducible forecasts
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Debug-level logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the weather forecaster one or more questions on the same thread
    Weather {
        /// Questions, asked in order; defaults exercise thread memory
        questions: Vec<String>,

        #[arg(long, default_value = "weather-demo")]
        thread_id: String,
    },
    /// Interactive chat with the weather forecaster
    Chat {
        #[arg(long, default_value = "chat")]
        thread_id: String,
    },
    /// Send one prompt without tools and print the reply
    Ping {
        prompt: Option<String>,
    },
}

impl Cli {
    /// Flag values win over the environment; the result is re-validated.
    fn apply(&self, cfg: &mut AgentConfig) -> Result<(), ConfigError> {
        if let Some(m) = &self.model {
            cfg.model = m.clone();
        }
        if let Some(b) = &self.base_url {
            cfg.base_url = b.clone();
        }
        if let Some(t) = self.temperature {
            cfg.temperature = t;
        }
        if let Some(n) = self.max_iterations {
            cfg.max_iterations = n;
        }
        if let Some(n) = self.max_tokens {
            cfg.max_tokens = Some(n);
        }
        if let Some(secs) = self.model_timeout_secs {
            cfg.model_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.tool_timeout_secs {
            cfg.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_retries {
            cfg.max_retries = n;
        }
        cfg.validate()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut cfg = AgentConfig::from_env().context("read configuration from environment")?;
    cli.apply(&mut cfg).context("invalid command-line settings")?;

    match &cli.command {
        Command::Weather {
            questions,
            thread_id,
        } => {
            let ctl = agent::weather_controller(&cfg, &cli.location, cli.seed)?;
            let questions: Vec<String> = if questions.is_empty() {
                DEFAULT_WEATHER_QUESTIONS.iter().map(|q| q.to_string()).collect()
            } else {
                questions.clone()
            };
            run_weather(&ctl, thread_id, &questions).await
        }
        Command::Chat { thread_id } => {
            let ctl = agent::weather_controller(&cfg, &cli.location, cli.seed)?;
            run_chat(&ctl, thread_id).await
        }
        Command::Ping { prompt } => {
            if cli.temperature.is_none() {
                cfg.temperature = PING_TEMPERATURE;
            }
            let prompt = prompt.as_deref().unwrap_or(PING_PROMPT);
            run_ping(&cfg, prompt).await
        }
    }
}

async fn run_weather(ctl: &TurnController, thread_id: &str, questions: &[String]) -> Result<()> {
    for q in questions {
        println!("> {q}");
        let out = ctl
            .run_turn(thread_id, q)
            .await
            .with_context(|| format!("turn failed for {q:?}"))?;
        println!("{}", out.answer);
        println!(
            "  [{} model calls, {} tool calls, {} tokens]",
            out.model_calls,
            out.tool_calls,
            out.usage.total()
        );
        println!();
    }
    Ok(())
}

async fn run_chat(ctl: &TurnController, thread_id: &str) -> Result<()> {
    println!(
        "thread {thread_id}; /history, /resume, /quit. Ctrl-C cancels a running turn, or exits when idle."
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let next = tokio::select! {
            line = lines.next_line() => line.context("read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = next else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                let conv = ctl.store().load(thread_id).await?;
                for m in &conv.messages {
                    print_message(m);
                }
                continue;
            }
            _ => {}
        }

        let token = CancellationToken::new();
        let turn = async {
            if line == "/resume" {
                ctl.resume_turn_with_cancel(thread_id, token.clone()).await
            } else {
                ctl.run_turn_with_cancel(thread_id, line, token.clone()).await
            }
        };
        tokio::pin!(turn);
        let result = tokio::select! {
            r = &mut turn => r,
            _ = tokio::signal::ctrl_c() => {
                token.cancel();
                turn.await
            }
        };

        match result {
            Ok(out) => println!("{}\n", out.answer),
            Err(AgentError::Cancelled) => println!("(cancelled; /resume to continue)\n"),
            Err(e @ AgentError::NothingToResume(_)) => println!("{e}\n"),
            Err(e) => {
                tracing::error!(thread_id, error = %e, "turn failed");
                println!("error: {e} (/resume retries from the last committed step)\n");
            }
        }
    }
    Ok(())
}

fn print_message(m: &Message) {
    match m {
        Message::Assistant { content, tool_calls } if !tool_calls.is_empty() => {
            for c in tool_calls {
                println!("assistant -> {}({})", c.name, c.arguments_string());
            }
            if !content.is_empty() {
                println!("assistant: {content}");
            }
        }
        Message::ToolResult { name, content, .. } => println!("tool {name}: {content}"),
        other => println!("{}: {}", other.role(), other.content()),
    }
}

async fn run_ping(cfg: &AgentConfig, prompt: &str) -> Result<()> {
    let llm = ChatOpenAI::new(cfg.openai_config()?).context("build model client")?;
    tracing::info!(model = llm.model(), base_url = %cfg.base_url, "ping");
    let options = cfg.turn_options();
    let reply = invoke_with_retry(
        &llm as &dyn LlmClient,
        &[Message::user(prompt)],
        "",
        options.model_timeout,
        &options.retry,
    )
    .await
    .context("ping failed")?;
    println!("{}", reply.content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("agentloop").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_every_tunable() {
        let cli = parse(&[
            "ping",
            "--model",
            "moonshot-v1-32k",
            "--max-iterations",
            "4",
            "--max-tokens",
            "256",
            "--model-timeout-secs",
            "5",
            "--tool-timeout-secs",
            "2",
            "--max-retries",
            "0",
        ]);
        let mut cfg = AgentConfig::default();
        cli.apply(&mut cfg).unwrap();
        assert_eq!(cfg.model, "moonshot-v1-32k");
        assert_eq!(cfg.max_iterations, 4);
        assert_eq!(cfg.max_tokens, Some(256));
        assert_eq!(cfg.model_timeout, Duration::from_secs(5));
        assert_eq!(cfg.tool_timeout, Duration::from_secs(2));
        assert_eq!(cfg.max_retries, 0);
    }

    #[test]
    fn zero_iterations_flag_is_rejected() {
        let cli = parse(&["--max-iterations", "0", "weather"]);
        let mut cfg = AgentConfig::default();
        assert!(matches!(
            cli.apply(&mut cfg),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn absent_flags_keep_environment_values() {
        let cli = parse(&["chat"]);
        let mut cfg = AgentConfig {
            max_retries: 5,
            ..AgentConfig::default()
        };
        cli.apply(&mut cfg).unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cli.location, "Florida");
    }
}
