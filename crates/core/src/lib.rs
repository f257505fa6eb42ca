//! Meridian Core - Shared domain types.
//!
//! This crate provides the common vocabulary used across all Meridian
//! components:
//! - `store` - The transactional entity store boundary
//! - `engine` - Validation, mutation, and query engines
//! - `jobs` - Scheduled consistency jobs
//! - `cli` - Command-line entry points
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no async. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and phone numbers
//! - [`entity`] - The Customer / Product / Order domain model
//! - [`query`] - Declarative filter predicates, sorting, and cursor pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod entity;
pub mod query;
pub mod types;

pub use entity::*;
pub use query::*;
pub use types::*;
