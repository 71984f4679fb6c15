use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Marker returned when a wait was interrupted by shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Sending half of the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, observed at every suspension point
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // no receivers left means nobody is waiting
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered (or the trigger was dropped)
    pub async fn triggered(&mut self) {
        let waited = self.rx.wait_for(|stop| *stop).await.map(|_| ());
        if waited.is_err() {
            debug!("Shutdown trigger dropped");
        }
    }

    pub async fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        self.run(tokio::time::sleep(duration)).await
    }

    /// Drive `fut` unless shutdown wins the race
    pub async fn run<F: Future>(&mut self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_triggered() {
            return Err(Cancelled);
        }
        tokio::select! {
            _ = self.triggered() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}

/// Handle the host keeps for a supervised background task
pub struct MonitorHandle {
    trigger: ShutdownTrigger,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn new(trigger: ShutdownTrigger, task: JoinHandle<()>) -> Self {
        Self { trigger, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and wait for the task to unwind
    pub async fn stop(self) {
        self.trigger.trigger();
        if let Err(e) = self.task.await {
            warn!("Monitor task ended abnormally: {}", e);
        }
    }
}
