//!
//! Common types and utilities shared by the alert scanner.
//!
//! This crate aggregates:
//! - `error` — unified error type `AlertError` and startup `ConfigError`.
//! - `result` — handy `Result<T, AlertError>` alias.
//! - `symbols` — scanned instruments and parsing helpers.
//! - `snapshot` — quote/option-chain results and the persisted payload.
//! - `net` — broker and chat endpoint constants.
#![warn(missing_docs)]
pub mod error;
pub mod net;
pub mod result;
pub mod snapshot;
pub mod symbols;

pub use error::{AlertError, ConfigError};
pub use result::Result;
pub use snapshot::{OptionChainResult, QuoteResult, Snapshot, SnapshotPayload};
pub use symbols::Symbol;
