//! Record store with SQLite backing and weighted search
//!
//! Provides durable storage, uniqueness-checked batch inserts and ranked
//! search for user records.
//!
//! # Example
//!
//! ```ignore
//! use roster_core::NewRecord;
//! use roster_store::RecordStore;
//!
//! let store = RecordStore::open(&db_path).await?;
//!
//! store
//!     .insert(vec![
//!         NewRecord::new("alice123", "alice@example.com")
//!             .with_name("Alice Johnson")
//!             .with_bio("I love coding and coffee!"),
//!     ])
//!     .await?;
//!
//! for hit in store.search("coding").await? {
//!     println!("{} (score: {})", hit.record.username, hit.score);
//! }
//!
//! store.close().await?;
//! ```

mod error;
mod migration;
mod record_store;
mod schema;

pub use error::{Error, Result};
pub use record_store::{RecordStore, SearchFilters, StoreStats};
