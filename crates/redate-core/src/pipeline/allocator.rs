//! Collision-free destination names shared by all conversion workers.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Hands out destination paths that no other worker, and no existing file,
/// already holds.
///
/// A returned path exists on disk as an empty placeholder; the caller
/// overwrites it with the real content. Clones share one reservation set.
#[derive(Debug, Clone, Default)]
pub struct PathAllocator {
    reserved: Arc<Mutex<HashSet<PathBuf>>>,
}

impl PathAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `dir/name.ext`, or the first free `dir/name_N.ext`.
    pub fn allocate(&self, dir: &Path, desired: &str) -> io::Result<PathBuf> {
        let desired_path = Path::new(desired);
        let stem = desired_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| desired.to_string());
        let ext = desired_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut reserved = self.reserved.lock().unwrap_or_else(|e| e.into_inner());
        let mut counter: u64 = 0;
        loop {
            let name = if counter == 0 {
                format!("{stem}{ext}")
            } else {
                format!("{stem}_{counter}{ext}")
            };
            counter += 1;

            let candidate = dir.join(name);
            if reserved.contains(&candidate) {
                continue;
            }
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => {
                    reserved.insert(candidate.clone());
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// [`Self::allocate`] on the blocking pool, for async callers.
    ///
    /// Placeholder creation is file system I/O done under the lock.
    pub async fn reserve(&self, dir: &Path, desired: &str) -> io::Result<PathBuf> {
        let alloc = self.clone();
        let dir = dir.to_path_buf();
        let desired = desired.to_string();
        tokio::task::spawn_blocking(move || alloc.allocate(&dir, &desired))
            .await
            .map_err(|e| io::Error::other(format!("Task join error: {e}")))?
    }

    /// Number of paths handed out so far.
    pub fn reserved_count(&self) -> usize {
        self.reserved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = PathAllocator::new();

        let names: Vec<String> = (0..3)
            .map(|_| {
                alloc
                    .allocate(dir.path(), "a.jpg")
                    .unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a.jpg", "a_1.jpg", "a_2.jpg"]);
        assert!(dir.path().join("a_2.jpg").exists());
    }

    #[test]
    fn test_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"taken").unwrap();
        let alloc = PathAllocator::new();

        let path = alloc.allocate(dir.path(), "b.mp4").unwrap();
        assert_eq!(path, dir.path().join("b_1.mp4"));
        assert_eq!(std::fs::read(dir.path().join("b.mp4")).unwrap(), b"taken");
    }

    #[test]
    fn test_no_extension() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = PathAllocator::new();
        alloc.allocate(dir.path(), "README").unwrap();
        let second = alloc.allocate(dir.path(), "README").unwrap();
        assert_eq!(second, dir.path().join("README_1"));
    }

    #[test]
    fn test_concurrent_allocations_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = Arc::new(PathAllocator::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let alloc = alloc.clone();
                let dir = dir.path().to_path_buf();
                std::thread::spawn(move || alloc.allocate(&dir, "same.jpg").unwrap())
            })
            .collect();

        let paths: HashSet<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(paths.len(), 16);
        assert_eq!(alloc.reserved_count(), 16);
    }

    #[tokio::test]
    async fn test_reserve_from_async_workers() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = PathAllocator::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = alloc.clone();
                let dir = dir.path().to_path_buf();
                tokio::spawn(async move { alloc.reserve(&dir, "clip.mp4").await.unwrap() })
            })
            .collect();

        let mut paths = HashSet::new();
        for handle in handles {
            paths.insert(handle.await.unwrap());
        }
        assert_eq!(paths.len(), 8);
        assert!(paths.contains(&dir.path().join("clip.mp4")));
        assert!(paths.contains(&dir.path().join("clip_7.mp4")));
        assert_eq!(alloc.reserved_count(), 8);
    }

    #[tokio::test]
    async fn test_reserve_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = PathAllocator::new();
        assert!(alloc.reserve(&dir.path().join("nope"), "a.jpg").await.is_err());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = PathAllocator::new();
        assert!(alloc.allocate(&dir.path().join("nope"), "a.jpg").is_err());
    }
}
