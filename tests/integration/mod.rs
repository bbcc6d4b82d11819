//! Integration Tests Module
//!
//! End-to-end tests for the interview engine: the full per-turn pipeline
//! against a scripted provider, and the quality dashboard over seeded
//! telemetry. All tests use in-memory SQLite via
//! MessageStore::new_in_memory(). No network calls are made.

// Shared scripted LLM provider
mod support;

// Full turn pipeline tests
mod turn_engine_test;

// Quality dashboard aggregation tests
mod dashboard_test;
