//! Interview Core
//!
//! Foundational types for the interview conversation engine workspace.
//! This crate has zero dependencies on application-level code (storage,
//! LLM providers, HTTP).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `language` - `Language` resolution and per-language pattern tables
//! - `phase` - Interview phases, transition modes, turn signals, depth buckets
//! - `topic` - Topic blocks, turn budgets, engagement signals
//! - `telemetry` - The persisted per-turn telemetry contract and its parser
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **Heuristics as data** - phrase lists and thresholds live in tables, not control flow
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod language;
pub mod phase;
pub mod telemetry;
pub mod topic;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Language ───────────────────────────────────────────────────────────
pub use language::{Language, LanguagePack};

// ── Phases & Signals ───────────────────────────────────────────────────
pub use phase::{Phase, ResponseDepth, TransitionMode, UserTurnSignal};

// ── Topics & Budgets ───────────────────────────────────────────────────
pub use topic::{excerpt, InterestingTopic, TopicBlock, TopicBudget};

// ── Telemetry Contract ─────────────────────────────────────────────────
pub use telemetry::{
    parse_assistant_telemetry, AssistantTelemetry, FlowFlags, MessageMetadata, QualityTelemetry,
};
