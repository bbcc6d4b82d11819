//! Engine Models

pub mod session;

pub use session::{BotConfig, ConversationState, FieldSpec, Message, MessageRole};
