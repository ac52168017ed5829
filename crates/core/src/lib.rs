//! Voltline Core - Shared domain types.
//!
//! This crate provides the value types used across all Voltline components:
//! - `storefront` - Remote data access, caching, cart and checkout services
//! - `cli` - Command-line driver for the storefront services
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no caching. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, prices, statuses, emails, and postal addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
