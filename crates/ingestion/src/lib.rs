//! # Ingestion
//!
//! Session store access.
//!
//! Responsibilities:
//! - Serve timing tables and channel slices from a session database
//! - Fetch lap-windowed slices in parallel, one task per channel
//! - Enforce the per-channel sample ceiling before any read
//! - Generate synthetic sessions for demos and tests
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use ingestion::{SliceFetcher, SqliteSessionStore};
//!
//! let store = Arc::new(SqliteSessionStore::open(path, &config.store)?);
//! let fetcher = SliceFetcher::new(store, config.limits.clone());
//! let slices = fetcher.fetch_lap_slices(&config.channels, &ranges).await?;
//! ```
//!
//! ## Testing
//!
//! ```ignore
//! use ingestion::{MemorySessionStore, SyntheticSession};
//!
//! let session = SyntheticSession::new(vec![92.4, 90.1, 91.7]);
//! let store = MemorySessionStore::from_synthetic(&session, &config);
//! ```

mod error;
mod fetch;
mod memory;
mod sqlite;
mod synthetic;

// Re-exports
pub use contracts::{ChannelSlice, SessionStore};
pub use error::{IngestionError, Result};
pub use fetch::{fetch_lap_slices, FetchMetrics, MetricsSnapshot, SliceFetcher};
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use synthetic::SyntheticSession;
