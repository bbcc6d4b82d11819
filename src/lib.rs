//! Interview Engine
//!
//! Turn-by-turn conversation controller for AI-led interviews. Imposes
//! deterministic structure on a non-deterministic LLM: topic coverage
//! with hard turn budgets, phase sequencing with a completion guard,
//! per-turn quality gating with one regeneration and a deterministic
//! fallback, and a persisted telemetry contract consumed by the offline
//! quality dashboard.

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::{BotConfig, ConversationState, FieldSpec, Message, MessageRole};
pub use services::{DashboardOptions, Supervisor, TurnEngine};
pub use storage::MessageStore;
pub use utils::error::{AppError, AppResult};
