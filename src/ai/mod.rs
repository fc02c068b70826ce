//! Built-in decision agent that plays through the public action interface.

pub mod agent;

pub use agent::{AiAgent, AiConfig, AiDecision, AiStrategy};
