//! # Tally Common Library
//!
//! Shared code for the tally election-result services:
//! - Domain records (constituencies, source reports, conflicts, audit entries)
//! - Static party and constituency catalog
//! - Event types (ElectionEvent) and the broadcast EventBus
//! - Bootstrap configuration loading
//! - SQLite database initialization
//! - Time helpers for the fixed election-day offset

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
