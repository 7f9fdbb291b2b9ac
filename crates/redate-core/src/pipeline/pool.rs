//! Fixed-size worker pool over a pre-filled job queue.
//!
//! Every job is enqueued before the workers start and the queue is closed
//! right after, so workers drain it and exit on their own. Results come back
//! through a channel sized to the job count; the coordinator pulls exactly
//! one result per job with [`WorkerPool::next`].

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// A running pool that yields one result per submitted job.
pub struct WorkerPool<R> {
    results: mpsc::Receiver<R>,
    expected: usize,
    received: usize,
    handles: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Start `workers` tasks running `work` over `jobs`.
    pub fn spawn<J, F, Fut>(jobs: Vec<J>, workers: usize, work: F) -> Self
    where
        J: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let expected = jobs.len();
        let capacity = expected.max(1);

        let (job_tx, job_rx) = mpsc::channel::<J>(capacity);
        for job in jobs {
            if job_tx.try_send(job).is_err() {
                tracing::error!("Job queue rejected a job");
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, results) = mpsc::channel::<R>(capacity);
        let work = Arc::new(work);

        let worker_count = workers.max(1).min(capacity);
        let handles = (0..worker_count)
            .map(|id| {
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                let work = Arc::clone(&work);
                tokio::spawn(async move {
                    loop {
                        let job = job_rx.lock().await.recv().await;
                        let Some(job) = job else { break };
                        if result_tx.send(work(job).await).await.is_err() {
                            // Coordinator is gone, stop processing
                            break;
                        }
                    }
                    tracing::trace!(worker = id, "Worker finished");
                })
            })
            .collect();

        Self {
            results,
            expected,
            received: 0,
            handles,
        }
    }
}

impl<R> WorkerPool<R> {
    /// Next completed result, or `None` once every job is accounted for.
    ///
    /// If a worker panicked its job yields no result; the drain ends when the
    /// surviving workers have finished.
    pub async fn next(&mut self) -> Option<R> {
        if self.received >= self.expected {
            return None;
        }
        match self.results.recv().await {
            Some(result) => {
                self.received += 1;
                Some(result)
            }
            None => {
                self.reap().await;
                None
            }
        }
    }

    /// Jobs submitted to the pool.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Results handed out so far.
    pub fn received(&self) -> usize {
        self.received
    }

    async fn reap(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!("Worker panicked: {}", e);
                }
            }
        }
        tracing::error!(
            expected = self.expected,
            received = self.received,
            "Worker pool closed before every job reported"
        );
    }
}

impl<R> Drop for WorkerPool<R> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_one_result_per_job() {
        let mut pool = WorkerPool::spawn((0..100).collect(), 4, |x: u32| async move { x * 2 });

        let mut results = Vec::new();
        while let Some(r) = pool.next().await {
            results.push(r);
        }
        results.sort();
        assert_eq!(results, (0..100).map(|x| x * 2).collect::<Vec<_>>());
        assert_eq!(pool.received(), pool.expected());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (active.clone(), peak.clone());
        let mut pool = WorkerPool::spawn((0..20).collect(), 3, move |_: u32| {
            let (a, p) = (a.clone(), p.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                a.fetch_sub(1, Ordering::SeqCst);
            }
        });
        while pool.next().await.is_some() {}

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_job_list() {
        let mut pool = WorkerPool::spawn(Vec::<u32>::new(), 10, |x| async move { x });
        assert_eq!(pool.next().await, None);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_hang() {
        let mut pool = WorkerPool::spawn((0..10).collect(), 2, |x: u32| async move {
            if x == 3 {
                panic!("boom");
            }
            x
        });

        let mut count = 0;
        while pool.next().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 9);
    }
}
