//! redate core - media export library.
//!
//! redate copies a tree of exported photos and videos into a destination,
//! naming every file after its capture date. Dates come from the earliest
//! trustworthy embedded tag, a Google Photos JSON sidecar, or the file name.
//!
//! # Architecture
//!
//! ```text
//! Discover → Analyze (pool) → Convert images (pool) → Convert videos (pool) → log.json
//! ```
//!
//! Files that cannot be dated or converted are copied untouched to `fail/`;
//! a run never stops because of a single file.
//!
//! # Usage
//!
//! ```rust,ignore
//! use redate_core::{Config, Exporter, NoProgress};
//!
//! #[tokio::main]
//! async fn main() -> redate_core::Result<()> {
//!     let exporter = Exporter::with_system_tools(Config::load()?);
//!     let summary = exporter
//!         .run("./Takeout".as_ref(), "./Takeout_Export".as_ref(), &NoProgress)
//!         .await?;
//!     println!("{} exported, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod audit;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod tools;
pub mod types;

// Re-exports for convenient access
pub use audit::{LogEntry, PipelineLog};
pub use config::Config;
pub use error::{ConfigError, PipelineError, RedateError, Result, SetupError, ToolError};
pub use pipeline::{
    default_destination, ConvertPhase, Exporter, NoProgress, ProgressEvent, ProgressSink,
};
pub use tools::{MediaTools, SystemTools};
pub use types::{
    AnalysisSummary, DateSource, FileRecord, MediaKind, Outcome, RunSummary, TagSet, VideoFacts,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
