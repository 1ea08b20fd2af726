//! # estate-index core
//!
//! Pure logic for estate-index: closed vocabularies, raw-record access,
//! listing normalization and validation, derived fields, vector-store
//! payloads, query filters, and the storage/embedding traits.
//!
//! This crate contains no tokio, no HTTP, and no filesystem I/O. Everything
//! here is a deterministic function of its inputs, which is what makes the
//! normalization rules testable in isolation.
//!
//! ## Pipeline
//!
//! ```text
//! raw JSON ──▶ preprocess ──▶ PropertyRecord ──▶ derive ──▶ payload ──▶ VectorStore
//!                  │                                              ▲
//!                  └── RecordError (skip + log)                   │
//!                                                query ──▶ filter ─┘
//! ```

pub mod derive;
pub mod diagnostics;
pub mod embedding;
pub mod error;
pub mod facility;
pub mod filter;
pub mod models;
pub mod payload;
pub mod preprocess;
pub mod raw;
pub mod results;
pub mod store;
pub mod vocab;

pub use error::RecordError;
pub use models::PropertyRecord;
pub use preprocess::preprocess;
pub use vocab::PropertyType;
