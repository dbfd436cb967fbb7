//! Record model, validation and weighted search scoring for roster.
//!
//! Storage lives in `roster-store`; this crate has no I/O beyond config
//! files and log output.

pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod scoring;
pub mod seed;
pub mod validation;

pub use config::{Config, SearchConfig, StoreConfig, StoreLocation};
pub use error::{Error, Result};
pub use record::{NewRecord, Record, SearchResult, Status};
pub use scoring::{FIELD_WEIGHTS, SearchField, rank, score_record, tokenize};
pub use seed::demo_records;
pub use validation::{ValidationError, prepare_batch, validate_record};
