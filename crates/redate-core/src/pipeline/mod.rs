//! Export pipeline components.
//!
//! This module contains every stage of an export run:
//! - **discovery**: Find candidate files in the source tree
//! - **analyze**: Classify files and probe video codecs
//! - **date** / **text_date**: Resolve capture dates from tags and names
//! - **reconcile**: Clean and merge primary and sidecar tags
//! - **sidecar**: Locate and parse JSON sidecars
//! - **convert**: Fail-soft per-file conversion
//! - **allocator**: Collision-free destination names
//! - **pool**: Fixed-size worker pool shared by both phases
//! - **processor**: Orchestrates a full run

pub mod allocator;
pub mod analyze;
pub mod context;
pub mod convert;
pub mod date;
pub mod discovery;
pub mod pool;
pub mod processor;
pub mod progress;
pub mod reconcile;
pub mod sidecar;
pub mod text_date;

// Re-exports for convenient access
pub use allocator::PathAllocator;
pub use analyze::{analyze, AnalyzedTree};
pub use context::{DestLayout, RunContext};
pub use convert::{convert_all, convert_file, ConversionJob, PhaseCounts};
pub use date::resolve_date;
pub use pool::WorkerPool;
pub use processor::{default_destination, Exporter};
pub use progress::{ConvertPhase, NoProgress, ProgressEvent, ProgressSink};
pub use sidecar::SidecarIndex;
pub use text_date::{find_date, TextDateError, LONG_DIGIT_RUN};
