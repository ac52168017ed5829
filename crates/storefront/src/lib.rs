//! Voltline Storefront library.
//!
//! Client-side services for an electrical equipment storefront backed by a
//! hosted database with a REST surface and a hosted identity provider.
//!
//! # Modules
//!
//! - [`backend`] - Typed table operations (`RestStore`, `InMemoryStore`)
//! - [`auth`] - Sign-in, sign-up and the shared session
//! - [`cache`] - Keyed query cache with explicit invalidation
//! - [`resources`] - Cache-backed accessors and mutations per table
//! - [`cart`] - Cart aggregation and guest-safe cart operations
//! - [`checkout`] - Order creation
//! - [`catalog`] - Filtering, sorting and the category tree
//! - [`routes`] - Route table and page gating
//! - [`state`] - The [`Storefront`](state::Storefront) composition root

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod backend;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod resources;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use error::{Result, StorefrontError};
pub use state::Storefront;
