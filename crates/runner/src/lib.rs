//! Process runner for the simulated device with graceful shutdown.
//!
//! The runner drives named app processes under a shared cancellation token:
//! - SIGTERM/SIGINT cancel the token, which processes observe between units of work
//! - The first process error cancels the remaining processes
//! - Closers always run afterwards, bounded by a timeout
//! - The outcome is handed back to the caller, which picks the exit code
//!
//! # Example
//!
//! ```no_run
//! use envsim_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = Runner::new()
//!         .with_app_process(|ctx| async move {
//!             tokio::select! {
//!                 _ = ctx.cancelled() => tracing::info!("stopping"),
//!                 _ = tokio::time::sleep(Duration::from_secs(3)) => tracing::info!("done"),
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("flushing telemetry");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await;
//!
//!     std::process::exit(if result.is_ok() { 0 } else { 1 });
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Boxed future returned by app processes and closers
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>;

/// Type alias for an app process function.
/// Takes a cancellation token and returns a future that resolves to Result<(), anyhow::Error>
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> ProcessFuture + Send>;

/// Type alias for a closer function.
/// Returns a future that resolves to Result<(), anyhow::Error>
pub type Closer = Box<dyn FnOnce() -> ProcessFuture + Send>;

struct NamedProcess {
    name: String,
    process: AppProcess,
}

/// Runs app processes until they finish, fail, or a shutdown signal arrives,
/// then runs closers and reports the first process error.
pub struct Runner {
    app_processes: Vec<NamedProcess>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
    handle_signals: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Creates a new Runner with a 10 second closer timeout and signal handling enabled.
    pub fn new() -> Self {
        Self {
            app_processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
            handle_signals: true,
        }
    }

    /// Adds an anonymous app process, named after its position.
    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        let name = format!("process_{}", self.app_processes.len());
        self.with_named_process(
            name,
            Box::new(move |token| -> ProcessFuture { Box::pin(process(token)) }),
        )
    }

    /// Adds a named app process.
    ///
    /// If any process returns an error, all processes are cancelled and the
    /// error becomes the result of [`Runner::run`].
    pub fn with_named_process(mut self, name: impl Into<String>, process: AppProcess) -> Self {
        self.app_processes.push(NamedProcess {
            name: name.into(),
            process,
        });
        self
    }

    /// Adds a closer, executed after all app processes have stopped.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers
            .push(Box::new(move || -> ProcessFuture { Box::pin(closer()) }));
        self
    }

    /// Sets the timeout for executing closers.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Sets a custom cancellation token, allowing external stop requests.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Disables SIGINT/SIGTERM handling; the token is then the only stop signal.
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    /// Runs all app processes and closers, returning the first process error.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for NamedProcess { name, process } in self.app_processes {
            let process_token = token.clone();
            join_set.spawn(async move {
                tracing::debug!(process = %name, "starting app process");
                let result = process(process_token).await;
                (name, result)
            });
        }

        let signal_tasks = if self.handle_signals {
            spawn_signal_handlers(&token)
        } else {
            Vec::new()
        };

        let mut first_error = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!(process = %name, "app process completed");
                }
                Ok((name, Err(err))) => {
                    tracing::error!(process = %name, "app process error: {:#}", err);
                    if first_error.is_none() {
                        first_error = Some(err.context(format!("process '{}' failed", name)));
                    }
                    token.cancel();
                }
                Err(err) => {
                    tracing::error!("app process panicked: {}", err);
                    if first_error.is_none() {
                        first_error = Some(anyhow::anyhow!("app process panicked: {}", err));
                    }
                    token.cancel();
                }
            }
        }

        for task in signal_tasks {
            task.abort();
        }

        if !self.closers.is_empty() {
            tracing::info!("running closers with timeout of {:?}", self.closer_timeout);
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => tracing::info!("all closers completed"),
                Err(_) => tracing::error!("closers timed out after {:?}", self.closer_timeout),
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn spawn_signal_handlers(token: &CancellationToken) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    let ctrl_c_token = token.clone();
    tasks.push(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => tracing::error!("error setting up signal handler: {}", err),
        }
    }));

    #[cfg(unix)]
    {
        let sigterm_token = token.clone();
        tasks.push(tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    tracing::info!("received SIGTERM signal");
                    sigterm_token.cancel();
                }
                Err(err) => tracing::error!("error setting up SIGTERM handler: {}", err),
            }
        }));
    }

    tasks
}

/// Runs all closers concurrently; a failing closer does not stop the others.
async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();
    for closer in closers {
        closer_set.spawn(async move { closer().await });
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => tracing::debug!("closer completed successfully"),
            Ok(Err(err)) => tracing::error!("closer error: {:#}", err),
            Err(err) => tracing::error!("closer panicked: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_successful_process_returns_ok_and_runs_closers() {
        let closer_called = Arc::new(AtomicBool::new(false));
        let flag = closer_called.clone();

        let result = Runner::new()
            .without_signal_handlers()
            .with_app_process(|_ctx| async move { Ok(()) })
            .with_closer(move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .run()
            .await;

        assert!(result.is_ok());
        assert!(closer_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_process_error_is_returned_and_cancels_others() {
        let sibling_cancelled = Arc::new(AtomicBool::new(false));
        let flag = sibling_cancelled.clone();

        let result = Runner::new()
            .without_signal_handlers()
            .with_named_process(
                "session",
                Box::new(|_ctx| -> ProcessFuture {
                    Box::pin(async move { Err(anyhow::anyhow!("broker refused")) })
                }),
            )
            .with_app_process(move |ctx| async move {
                ctx.cancelled().await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .run()
            .await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("broker refused"));
        assert!(format!("{:#}", err).contains("session"));
        assert!(sibling_cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_external_cancellation_stops_processes() {
        let token = CancellationToken::new();
        let stopper = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.cancel();
        });

        let result = Runner::new()
            .without_signal_handlers()
            .with_cancellation_token(token)
            .with_app_process(|ctx| async move {
                tokio::select! {
                    _ = ctx.cancelled() => Ok(()),
                    _ = tokio::time::sleep(Duration::from_secs(100)) => {
                        Err(anyhow::anyhow!("not cancelled"))
                    }
                }
            })
            .run()
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_all_closers_run_even_if_one_fails() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = counter.clone();
        let second = counter.clone();

        Runner::new()
            .without_signal_handlers()
            .with_closer(move || async move {
                first.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("flush failed"))
            })
            .with_closer(move || async move {
                second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .run()
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closer_timeout_bounds_shutdown() {
        let result = Runner::new()
            .without_signal_handlers()
            .with_closer(|| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .with_closer_timeout(Duration::from_secs(1))
            .run()
            .await;

        assert!(result.is_ok());
    }
}
