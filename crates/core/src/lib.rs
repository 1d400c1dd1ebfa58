//! Core types and helpers for treewright
//!
//! This crate contains domain types shared across all other crates.

mod catalog;
mod constants;
mod conversation;
mod env_config;
mod error;
mod message;
mod suggestions;
mod sync;

pub use catalog::*;
pub use constants::*;
pub use conversation::*;
pub use env_config::env_parse_with_default;
pub use error::*;
pub use message::*;
pub use suggestions::*;
pub use sync::*;
