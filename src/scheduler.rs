//! Bounded task queue
//!
//! At most `K` submitted tasks run at once; the rest wait in arrival order.
//! A single dispatcher loop pulls jobs off an unbounded channel and only
//! spawns the next one after it holds a semaphore permit, so start order is
//! strictly FIFO even on a multi-threaded runtime. Completion order is not
//! guaranteed.
//!
//! The queue tracks concurrency, not outcomes: a task returning an error
//! value is just a value, and siblings keep running.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{Notify, Semaphore, mpsc, oneshot};
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Task queue is closed")]
    Closed,

    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Inner {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    in_flight: AtomicUsize,
    queued: AtomicUsize,
    closed: AtomicBool,
    idle: Notify,
}

impl Inner {
    fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) == 0 && self.queued.load(Ordering::Acquire) == 0
    }
}

/// Decrements the in-flight count even if the task panics
struct InFlightSlot {
    inner: Arc<Inner>,
}

impl InFlightSlot {
    fn enter(inner: Arc<Inner>) -> Self {
        let now = inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        debug_assert!(now <= inner.concurrency);
        Self { inner }
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.inner.idle.notify_waiters();
    }
}

/// Handle to one submitted task; resolves to the task's output
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, QueueError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without running: the queue shut down first
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Job>,
    inner: Arc<Inner>,
}

impl TaskQueue {
    /// Create a queue running at most `concurrency` tasks at once
    ///
    /// Must be called inside a tokio runtime; spawns the dispatcher loop.
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        let inner = Arc::new(Inner {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            in_flight: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            idle: Notify::new(),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(rx, inner.clone()));

        Self { tx, inner }
    }

    /// Queue a task; it starts once a slot is free and every earlier task has started
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, rx) = oneshot::channel();

        if self.inner.closed.load(Ordering::Acquire) {
            let _ = result_tx.send(Err(QueueError::Closed));
            return TaskHandle { rx };
        }

        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|panic| QueueError::TaskPanicked(panic_message(panic.as_ref())));
            // Receiver may have been dropped; nobody is waiting then
            let _ = result_tx.send(outcome);
        });

        self.inner.queued.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(job).is_err() {
            // Dispatcher is gone; the job (and its sender) were dropped with the error
            self.inner.queued.fetch_sub(1, Ordering::AcqRel);
        }

        TaskHandle { rx }
    }

    /// Stop accepting tasks; queued tasks that have not started resolve to `Closed`
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!("Closing task queue");
            self.inner.semaphore.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Wait until nothing is queued or running, up to `grace`. Returns whether it drained.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let drained = tokio::time::timeout(grace, async {
            loop {
                let notified = self.inner.idle.notified();
                if self.inner.is_idle() {
                    return;
                }
                notified.await;
            }
        })
        .await;
        drained.is_ok()
    }

    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Tasks currently executing
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Tasks submitted but not yet started
    pub fn queued(&self) -> usize {
        self.inner.queued.load(Ordering::Acquire)
    }
}

async fn dispatch(mut rx: mpsc::UnboundedReceiver<Job>, inner: Arc<Inner>) {
    while let Some(job) = rx.recv().await {
        let permit = match inner.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                inner.queued.fetch_sub(1, Ordering::AcqRel);
                break;
            }
        };
        // Counted as running before it stops counting as queued
        let slot = InFlightSlot::enter(inner.clone());
        inner.queued.fetch_sub(1, Ordering::AcqRel);

        tokio::spawn(async move {
            job.await;
            drop(slot);
            drop(permit);
        });
    }

    // Closed: drop whatever is still waiting so handles resolve to `Closed`
    rx.close();
    while let Ok(job) = rx.try_recv() {
        inner.queued.fetch_sub(1, Ordering::AcqRel);
        drop(job);
    }
    inner.idle.notify_waiters();
    warn!("Task queue dispatcher stopped");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
