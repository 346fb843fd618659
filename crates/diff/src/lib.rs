//! Run-to-run diffing of scraped meeting records
//!
//! Each source run is compared against the most recent run file of the same source, so that:
//! - records already persisted keep their storage id (updates instead of inserts)
//! - records repeated within a run are forwarded once
//! - records that disappeared are carried forward, upcoming ones marked cancelled
//!
//! ## Layout on disk
//!
//! ```text
//! <output_dir>/<feed_prefix>/<HHMMSS>/<source>.json    one JSON event per line
//! ```
//!
//! ## Flow
//!
//! ```text
//! RunIndex::build ─> DiffEngine ─diff()─> DiffPipeline ─close()─> CompletionHook (FeedWriter)
//! ```

mod engine;
mod error;
mod feed;
mod format;
pub mod ocd;
mod pipeline;
mod previous;
mod run_index;
mod settings;
mod stats;

pub use engine::{ChangeKind, DiffDecision, DiffEngine, DiffPhase, DiffedRecord, Finalized};
pub use error::{DiffError, Result};
pub use feed::FeedWriter;
pub use format::OutputFormat;
pub use pipeline::{CompletedRun, CompletionHook, DiffPipeline};
pub use previous::{IdentityMap, PreviousResults};
pub use run_index::RunIndex;
pub use settings::{
    DiffConfig, DiffSettings, FeedTemplate, DEFAULT_FEED_PREFIX, DEFAULT_OUTPUT_DIR,
    FEED_EXTENSION,
};
pub use stats::DiffStats;
