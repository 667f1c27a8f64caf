//! # Rollcall Common Library
//!
//! Shared code for the rollcall services including:
//! - Event types (RollcallEvent enum) and the broadcast EventBus
//! - Bootstrap configuration loading (TOML + environment)
//! - Server-Sent Events helpers
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
