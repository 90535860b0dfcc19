//! Turn controller: drives one user turn to a final answer.
//!
//! `AwaitingModel ⇄ ExecutingTools → Done`. Each model reply either ends the turn or names
//! tools to run; the assistant message and every tool result are then committed together
//! and the model is asked again. Bounded by `TurnOptions::max_iterations` model calls.

mod controller;
mod options;

pub use controller::TurnController;
pub use options::{TurnOptions, TurnOutput, TurnPhase, DEFAULT_MAX_ITERATIONS};
