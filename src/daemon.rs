//! Background worker lifecycle
//!
//! A [`Worker`] blocks in `start()` until its work ends or `stop()` is called
//! from another thread. [`spawn_background`] runs it and reports exactly one
//! completion result. [`supervise`] waits on a set of running workers and
//! shuts them down within a deadline.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Select, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Long-running unit of work that can be asked to finish early
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    /// Run until stopped or done
    fn start(&self) -> Result<()>;

    /// Ask a running `start()` to return. Must be safe to call if `start()`
    /// already returned or never ran.
    fn stop(&self) -> Result<()>;
}

/// Broadcast cancellation signal
///
/// Receivers never get a message: dropping the sender disconnects every
/// clone at once, and watchers treat disconnection as "cancelled".
pub struct Cancellation {
    sender: Option<Sender<()>>,
    receiver: Receiver<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            sender: Some(sender),
            receiver,
        }
    }

    pub fn token(&self) -> Receiver<()> {
        self.receiver.clone()
    }

    pub fn cancel(&mut self) {
        if self.sender.take().is_some() {
            debug!("Cancellation fired");
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `worker.start()` on its own thread and report its completion
///
/// A watcher thread waits for either `cancel` or the worker finishing on its
/// own. If cancellation comes first the watcher calls `stop()` once and the
/// completion carries `stop()`'s result. Otherwise it carries `start()`'s
/// result and `stop()` is never called. The returned channel receives exactly
/// one message.
pub fn spawn_background(cancel: Receiver<()>, worker: Arc<dyn Worker>) -> Result<Receiver<Result<()>>> {
    let name = worker.name().to_string();
    let (finished_tx, finished_rx) = bounded::<()>(1);
    let (done_tx, done_rx) = bounded(1);

    let watched = Arc::clone(&worker);
    let watcher = thread::Builder::new()
        .name(format!("{name}-watch"))
        .spawn(move || {
            select! {
                recv(cancel) -> _ => {
                    info!(worker = %watched.name(), "Stopping worker");
                    Some(watched.stop())
                }
                recv(finished_rx) -> _ => None,
            }
        })
        .context(format!("Failed to spawn watcher thread for {name}"))?;

    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            info!(worker = %worker.name(), "Worker started");
            let started = worker.start();

            // Capacity 1 and a single send: never blocks, even if the watcher left.
            let _ = finished_tx.send(());

            let stopped = watcher
                .join()
                .unwrap_or_else(|_| Some(Err(anyhow!("watcher thread for {} panicked", worker.name()))));

            let result = match stopped {
                Some(stop_result) => {
                    if let Err(e) = &started {
                        debug!(worker = %worker.name(), error = %e, "Start error superseded by stop");
                    }
                    stop_result
                }
                None => started,
            };

            match &result {
                Ok(()) => info!(worker = %worker.name(), "Worker finished"),
                Err(e) => warn!(worker = %worker.name(), error = %e, "Worker finished with error"),
            }
            let _ = done_tx.send(result);
        })
        .context(format!("Failed to spawn worker thread for {name}"))?;

    Ok(done_rx)
}

/// A worker handed to [`spawn_background`] and its completion channel
pub struct Running {
    pub name: String,
    pub done: Receiver<Result<()>>,
}

/// Start every worker on the same cancellation
pub fn spawn_all(cancellation: &Cancellation, workers: &[Arc<dyn Worker>]) -> Result<Vec<Running>> {
    workers
        .iter()
        .map(|worker| {
            Ok(Running {
                name: worker.name().to_string(),
                done: spawn_background(cancellation.token(), Arc::clone(worker))?,
            })
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("worker {0} exited before shutdown was requested")]
    EarlyExit(String),

    #[error("worker {0} did not shut down cleanly")]
    Stop(String),

    #[error("worker {worker} still running after {}s", timeout.as_secs())]
    TimedOut { worker: String, timeout: Duration },
}

/// Block until a signal arrives or a worker finishes, then cancel everything
/// and wait up to `timeout` for the rest
///
/// Workers only return on their own when something broke, so any completion
/// before a signal is an [`SupervisorError::EarlyExit`]. A worker still running
/// at the deadline is [`SupervisorError::TimedOut`], which takes precedence.
pub fn supervise(
    signals: &Receiver<i32>,
    running: &[Running],
    mut cancellation: Cancellation,
    timeout: Duration,
) -> Result<(), SupervisorError> {
    let mut failure = None;
    let mut finished = vec![false; running.len()];

    if let Some((index, result)) = wait_for_signal_or_exit(signals, running) {
        let name = &running[index].name;
        match result {
            Some(Ok(())) => error!(worker = %name, "Worker exited unexpectedly"),
            Some(Err(e)) => error!(worker = %name, error = %format!("{e:#}"), "Worker failed"),
            None => error!(worker = %name, "Worker thread died"),
        }
        finished[index] = true;
        failure = Some(SupervisorError::EarlyExit(name.clone()));
    }

    cancellation.cancel();
    let deadline = Instant::now() + timeout;

    for (worker, finished) in running.iter().zip(finished) {
        if finished {
            continue;
        }
        match worker.done.recv_deadline(deadline) {
            Ok(Ok(())) => info!(worker = %worker.name, "Worker shut down"),
            Ok(Err(e)) => {
                warn!(worker = %worker.name, error = %format!("{e:#}"), "Worker shut down with error");
                failure.get_or_insert_with(|| SupervisorError::Stop(worker.name.clone()));
            }
            Err(RecvTimeoutError::Timeout) => {
                return Err(SupervisorError::TimedOut {
                    worker: worker.name.clone(),
                    timeout,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!(worker = %worker.name, "Worker thread died during shutdown");
                failure.get_or_insert_with(|| SupervisorError::Stop(worker.name.clone()));
            }
        }
    }

    failure.map_or(Ok(()), Err)
}

/// Returns the worker's index and completion, or `None` for a signal
fn wait_for_signal_or_exit(signals: &Receiver<i32>, running: &[Running]) -> Option<(usize, Option<Result<()>>)> {
    let mut select = Select::new();
    let signal_index = select.recv(signals);
    let worker_indices: Vec<usize> = running.iter().map(|worker| select.recv(&worker.done)).collect();

    let operation = select.select();
    let index = operation.index();

    if index == signal_index {
        match operation.recv(signals) {
            Ok(signal) => info!(signal = signal, "Received signal, shutting down"),
            Err(_) => warn!("Signal listener stopped, shutting down"),
        }
        return None;
    }

    let worker = worker_indices.iter().position(|&i| i == index)?;
    Some((worker, operation.recv(&running[worker].done).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use crossbeam_channel::never;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct TestWorker {
        fail_start: bool,
        fail_stop: bool,
        release_tx: Sender<()>,
        release_rx: Receiver<()>,
        start_calls: AtomicUsize,
        stop_calls: AtomicUsize,
    }

    impl TestWorker {
        fn new(fail_start: bool, fail_stop: bool) -> Arc<Self> {
            let (release_tx, release_rx) = bounded(1);
            Arc::new(Self {
                fail_start,
                fail_stop,
                release_tx,
                release_rx,
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
            })
        }

        fn starts(&self) -> usize {
            self.start_calls.load(Ordering::SeqCst)
        }

        fn stops(&self) -> usize {
            self.stop_calls.load(Ordering::SeqCst)
        }
    }

    /// Keeps running whatever `stop()` says, until `release` is dropped
    struct StubbornWorker {
        release: Receiver<()>,
    }

    impl Worker for StubbornWorker {
        fn name(&self) -> &str {
            "stubborn"
        }

        fn start(&self) -> Result<()> {
            let _ = self.release.recv();
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            Ok(())
        }
    }

    impl Worker for TestWorker {
        fn name(&self) -> &str {
            "test"
        }

        fn start(&self) -> Result<()> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                bail!("start failed");
            }
            let _ = self.release_rx.recv();
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.release_tx.try_send(());
            if self.fail_stop {
                bail!("stop failed");
            }
            Ok(())
        }
    }

    #[test]
    fn test_start_and_stop() {
        let mut cancellation = Cancellation::new();
        let worker = TestWorker::new(false, false);
        let done = spawn_background(cancellation.token(), worker.clone()).unwrap();

        assert!(done.recv_timeout(Duration::from_millis(50)).is_err(), "worker should still be running");

        cancellation.cancel();
        let result = done.recv_timeout(TIMEOUT).expect("worker should finish after cancel");

        assert!(result.is_ok());
        assert_eq!(worker.starts(), 1);
        assert_eq!(worker.stops(), 1);
    }

    #[test]
    fn test_failed_start_skips_stop() {
        let cancellation = Cancellation::new();
        let worker = TestWorker::new(true, false);
        let done = spawn_background(cancellation.token(), worker.clone()).unwrap();

        let result = done.recv_timeout(TIMEOUT).expect("worker should finish on its own");

        assert_eq!(result.unwrap_err().to_string(), "start failed");
        assert_eq!(worker.starts(), 1);
        assert_eq!(worker.stops(), 0);
    }

    #[test]
    fn test_stop_error_is_reported() {
        let mut cancellation = Cancellation::new();
        let worker = TestWorker::new(false, true);
        let done = spawn_background(cancellation.token(), worker.clone()).unwrap();

        cancellation.cancel();
        let result = done.recv_timeout(TIMEOUT).expect("worker should finish after cancel");

        assert_eq!(result.unwrap_err().to_string(), "stop failed");
        assert_eq!(worker.stops(), 1);
    }

    #[test]
    fn test_cancel_after_completion_does_not_stop() {
        let mut cancellation = Cancellation::new();
        let worker = TestWorker::new(true, false);
        let done = spawn_background(cancellation.token(), worker.clone()).unwrap();

        assert!(done.recv_timeout(TIMEOUT).is_ok());
        cancellation.cancel();
        thread::sleep(Duration::from_millis(20));

        assert_eq!(worker.stops(), 0);
        assert!(done.try_recv().is_err(), "exactly one completion is sent");
    }

    #[test]
    fn test_one_cancellation_stops_many_workers() {
        let mut cancellation = Cancellation::new();
        let workers: Vec<_> = (0..3).map(|_| TestWorker::new(false, false)).collect();
        let dones: Vec<_> = workers
            .iter()
            .map(|w| spawn_background(cancellation.token(), w.clone()).unwrap())
            .collect();

        cancellation.cancel();
        cancellation.cancel();

        for done in &dones {
            assert!(done.recv_timeout(TIMEOUT).unwrap().is_ok());
        }
        for worker in &workers {
            assert_eq!(worker.stops(), 1);
        }
    }

    #[test]
    fn test_supervise_signal_then_clean_shutdown() {
        let cancellation = Cancellation::new();
        let worker = TestWorker::new(false, false);
        let running = spawn_all(&cancellation, &[worker.clone() as Arc<dyn Worker>]).unwrap();
        let (signal_tx, signals) = bounded(1);
        signal_tx.send(15).unwrap();

        supervise(&signals, &running, cancellation, TIMEOUT).unwrap();

        assert_eq!(worker.stops(), 1);
    }

    #[test]
    fn test_supervise_early_exit_is_fatal() {
        let cancellation = Cancellation::new();
        let healthy = TestWorker::new(false, false);
        let broken = TestWorker::new(true, false);
        let workers: Vec<Arc<dyn Worker>> = vec![healthy.clone(), broken.clone()];
        let running = spawn_all(&cancellation, &workers).unwrap();

        let result = supervise(&never(), &running, cancellation, TIMEOUT);

        assert!(matches!(result, Err(SupervisorError::EarlyExit(name)) if name == "test"));
        assert_eq!(healthy.stops(), 1, "the other workers are still shut down");
        assert_eq!(broken.stops(), 0);
    }

    #[test]
    fn test_supervise_reports_stop_failure() {
        let cancellation = Cancellation::new();
        let worker = TestWorker::new(false, true);
        let running = spawn_all(&cancellation, &[worker as Arc<dyn Worker>]).unwrap();
        let (signal_tx, signals) = bounded(1);
        signal_tx.send(2).unwrap();

        let result = supervise(&signals, &running, cancellation, TIMEOUT);

        assert!(matches!(result, Err(SupervisorError::Stop(_))));
    }

    #[test]
    fn test_supervise_times_out_on_stuck_worker() {
        let cancellation = Cancellation::new();
        let (release_tx, release) = bounded::<()>(0);
        let running = spawn_all(&cancellation, &[Arc::new(StubbornWorker { release }) as Arc<dyn Worker>]).unwrap();
        let (signal_tx, signals) = bounded(1);
        signal_tx.send(15).unwrap();

        let started = Instant::now();
        let result = supervise(&signals, &running, cancellation, Duration::from_millis(100));

        assert!(started.elapsed() < TIMEOUT);
        assert!(matches!(
            result,
            Err(SupervisorError::TimedOut { ref worker, .. }) if worker == "stubborn"
        ));
        drop(release_tx);
    }
}
