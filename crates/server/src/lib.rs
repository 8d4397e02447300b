//! Storehouse server library.
//!
//! Accounts, sessions, products, and orders over a relational store, served
//! as JSON over HTTP. Exposed as a library so the CLI and the integration
//! tests drive the same code the binary serves.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod patch;
pub mod routes;
pub mod services;
pub mod state;
