//! Storage Layer
//!
//! SQLite persistence for conversation messages using rusqlite with r2d2
//! connection pooling.

pub mod messages;

pub use messages::*;
