//! Domain layer for the versioned record store.
//!
//! Contains the snapshot model, field-change semantics, the caller-facing
//! error taxonomy and the [`service::RecordService`] facade trait. Nothing in
//! this crate performs I/O.

pub mod context;
pub mod error;
pub mod record;
pub mod service;
pub mod types;
