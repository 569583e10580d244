//! Assistant bridge: conversational itinerary editing via tool calls
//!
//! The bridge drives one conversation turn at a time: the model either
//! answers in plain text (turn complete) or returns a batch of tool
//! invocations, which are executed sequentially against the itinerary
//! reducer and fed back until the model produces text.

pub mod bridge;
pub mod gemini;
pub mod prompt;
pub mod tools;

pub use bridge::{AssistantBridge, ChatModel};
pub use gemini::{Content, FunctionCall, GeminiClient, Part};
pub use tools::{ToolContext, ToolDefinition, ToolOutcome};
