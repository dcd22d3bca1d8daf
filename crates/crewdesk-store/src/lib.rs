//! Durable SQLite-backed job store.
//!
//! This crate provides:
//! - Job row persistence and schema management
//! - Atomic claiming of pending work under concurrent pollers
//! - Guarded success/failure resolution (idempotent after the fact)
//! - Descriptive lookups embedded in generated reports
//!
//! The store is the only state shared across worker processes; every
//! mutation is a short-lived, conditionally-guarded update so two pollers
//! can never both own the same row.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{JobStore, NewEstimateJob, NewReceiptJob};
