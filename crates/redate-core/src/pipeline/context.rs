//! Per-run state shared by every worker.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, OutputConfig};
use crate::tools::MediaTools;

use super::allocator::PathAllocator;

/// Directory layout of an export destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestLayout {
    pub root: PathBuf,
    pub success: PathBuf,
    pub fail: PathBuf,
    /// Scratch space for per-job workspaces
    pub temp: PathBuf,
    pub log: PathBuf,
}

impl DestLayout {
    pub fn new(root: &Path, output: &OutputConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            success: root.join(&output.success_dir),
            fail: root.join(&output.fail_dir),
            temp: root.join(&output.temp_dir),
            log: root.join(&output.log_file),
        }
    }

    /// Create the destination root and its subdirectories.
    pub fn create(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        for dir in [&self.success, &self.fail, &self.temp] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Everything a run needs, created once at setup and shared by reference.
pub struct RunContext {
    pub config: Config,
    pub tools: Arc<dyn MediaTools>,
    pub layout: DestLayout,
    pub allocator: PathAllocator,
}

impl RunContext {
    pub fn new(config: Config, tools: Arc<dyn MediaTools>, dest: &Path) -> Self {
        let layout = DestLayout::new(dest, &config.output);
        Self {
            config,
            tools,
            layout,
            allocator: PathAllocator::new(),
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
