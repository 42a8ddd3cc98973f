pub mod anthropic;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod service;

#[cfg(test)]
pub mod mock;

pub use anthropic::{AnthropicClient, CompletionClient};
pub use service::{CoachService, CoachSettings};
