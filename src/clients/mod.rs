#[cfg(feature = "anthropic")]
pub mod claude;
pub mod flexible;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod mock;

#[cfg(feature = "anthropic")]
pub use claude::{ClaudeClient, ClaudeConfig, ClaudeModel};
pub use flexible::*;
#[cfg(feature = "gemini")]
pub use gemini::{GeminiClient, GeminiConfig, GeminiModel};
pub use mock::*;
