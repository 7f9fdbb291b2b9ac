//! One-way progress reporting from the pipeline to whatever renders it.

use std::path::PathBuf;

use crate::types::{AnalysisSummary, RunSummary};

/// Conversion sub-phase. Images run before videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertPhase {
    Images,
    Videos,
}

impl std::fmt::Display for ConvertPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Images => write!(f, "images"),
            Self::Videos => write!(f, "videos"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Quick count of the source tree started
    Counting,
    Counted { files: usize },
    Analyzing { done: usize, total: usize },
    Analyzed(AnalysisSummary),
    Converting {
        phase: ConvertPhase,
        done: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
        /// Source of the result that was just recorded
        current: PathBuf,
    },
    Complete(RunSummary),
}

/// Receiver of progress events. Must not block.
pub trait ProgressSink: Send + Sync {
    fn update(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _event: ProgressEvent) {}
}
