//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for job postings.

mod database;

pub use database::{JobStore, MissingJobUrlId};
