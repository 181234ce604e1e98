/// runtime.rs — Background-task lifecycle
///
/// Each long-running loop (strategy sweep, restore watch) is spawned behind
/// a [`RuntimeHandle`]: the task's JoinHandle plus its shutdown signal,
/// owned by `main` and passed by reference — never ambient globals.
use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct RuntimeHandle {
    name:     &'static str,
    shutdown: watch::Sender<bool>,
    task:     JoinHandle<()>,
}

impl RuntimeHandle {
    /// Spawn `f` with a shutdown receiver it must honor at its next safe
    /// point.
    pub fn spawn<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(f(rx));
        info!("[MAIN] {name} task started");
        Self { name, shutdown, task }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal shutdown and wait for the task to drain. In-flight network
    /// calls complete or time out naturally; the task is never aborted, so
    /// an order submission already on the wire is never left in doubt.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => info!("[MAIN] {} task stopped", self.name),
            Err(e) => warn!("[MAIN] {} task join failed: {e}", self.name),
        }
    }
}
