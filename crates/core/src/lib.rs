//! Meal Plan Core - Shared types library.
//!
//! This crate provides the domain types used across the meal plan workspace:
//! - `server` - HTTP API, store and cache backends, authentication
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, usernames, and the meal plan record with its
//!   create/patch inputs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
