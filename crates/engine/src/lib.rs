//! Meridian Engine - Validation, mutation, and query engines.
//!
//! The engine sits between the API boundary and the store:
//!
//! ```text
//! request -> validation -> mutation engine -> store transaction -> result
//! query   -> query engine ------------------> store reads -------> page
//! ```
//!
//! - [`validation`] holds the pure field-level checks. Malformed input is
//!   reported as data ([`FieldError`] lists), never raised.
//! - [`CrmEngine`] orchestrates create / bulk-create operations, wrapping
//!   each unit of work in one store transaction and computing derived
//!   fields (order totals). Batch operations report per-item results
//!   instead of failing the whole batch.
//! - Query operations pass the declarative filter model through to the
//!   store, which filters before paginating.
//!
//! Errors follow a four-way taxonomy ([`EngineError`]): validation,
//! not-found, conflict, internal. The first three are user-facing data;
//! internal errors roll the transaction back and surface opaquely. The
//! engine never retries - that is the caller's decision.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod engine;
mod error;
pub mod validation;

pub use engine::{BulkError, BulkOutcome, CreatedCustomer, CreatedOrder, CrmEngine};
pub use error::{EngineError, FieldError};
