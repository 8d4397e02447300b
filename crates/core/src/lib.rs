//! Storehouse Core - Shared types library.
//!
//! This crate provides common types used across all Storehouse components:
//! - `server` - JSON-over-HTTP backend (accounts, sessions, products, orders)
//! - `cli` - Command-line tools for schema bootstrap and staff provisioning
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and the enumerations
//!   persisted as integer codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
