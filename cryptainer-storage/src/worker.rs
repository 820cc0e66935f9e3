//! Bounded background worker pool (SPEC_FULL.md §4.H, §5): a `tokio::sync::mpsc`
//! bounded channel feeds a dispatcher task, which spawns one `tokio::task`
//! per job, itself bounded by a `tokio::sync::Semaphore` so only a fixed
//! number of cryptainer builds run concurrently. The dispatcher owns the
//! channel's receive side for the life of the pool, mirroring the
//! stop-handle idiom of `cryptainer_keystore::generator`.
//!
//! Executor discipline (§4.H): every job's panic or returned error is caught
//! at the dispatcher and logged via `tracing::error!("caught exception")`;
//! `submit` itself never fails because of a job's own outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify, Semaphore};
use tracing::error;

use cryptainer_core::CryptainerError;

pub type Job = Pin<Box<dyn Future<Output = Result<(), CryptainerError>> + Send>>;

pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    dispatcher: tokio::task::JoinHandle<()>,
}

impl WorkerPool {
    /// `queue_capacity` bounds how many submitted-but-not-yet-dispatched jobs
    /// can sit in the channel before `submit` blocks; `concurrency` bounds
    /// how many jobs run at once.
    pub fn spawn(queue_capacity: usize, concurrency: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let dispatch_in_flight = in_flight.clone();
        let dispatch_idle = idle.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore is never closed");
                let in_flight = dispatch_in_flight.clone();
                let idle = dispatch_idle.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    match tokio::spawn(job).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!(error = %e, "caught exception"),
                        Err(join_error) => error!(error = %join_error, "caught exception"),
                    }
                    if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                        idle.notify_waiters();
                    }
                });
            }
        });

        Self { sender, in_flight, idle, dispatcher }
    }

    /// Enqueue `job`. Counts against the in-flight total immediately, so a
    /// concurrent `wait_for_idle` sees it even before the dispatcher has
    /// pulled it off the channel.
    pub async fn submit(&self, job: Job) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).await.is_err() {
            // Dispatcher gone; nothing will ever run this job.
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.idle.notify_waiters();
        }
    }

    /// Block until every submitted job has completed (test/inspection aid, §4.H).
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
