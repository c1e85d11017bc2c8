use crate::condition::Value;
use crate::data::EvaluationContext;
use crate::error::RunnerError;
use ahash::AHashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// A single custom-code execution request.
#[derive(Debug, Clone, Copy)]
pub struct CodeRequest<'a> {
    pub language: &'a str,
    pub code: &'a str,
    pub timeout: Duration,
}

/// The pluggable capability that executes `CUSTOM_CODE` leaves.
///
/// Implementations must return within roughly `request.timeout`. The context
/// is a read-only snapshot shared across all custom leaves of one evaluation.
pub trait CodeRunner: Send + Sync {
    fn run(
        &self,
        request: &CodeRequest<'_>,
        context: Arc<EvaluationContext>,
    ) -> Result<Value, RunnerError>;
}

/// A runner for hosts that do not allow custom code at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRunner;

impl CodeRunner for DisabledRunner {
    fn run(
        &self,
        _request: &CodeRequest<'_>,
        _context: Arc<EvaluationContext>,
    ) -> Result<Value, RunnerError> {
        Err(RunnerError::Disabled)
    }
}

/// Cooperative cancellation flag handed to script handlers. It is raised
/// once the caller has stopped waiting for the result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Executes code for one language.
pub trait ScriptHandler: Send + Sync {
    fn execute(
        &self,
        code: &str,
        context: &EvaluationContext,
        cancel: &CancelToken,
    ) -> Result<Value, String>;
}

impl<F> ScriptHandler for F
where
    F: Fn(&str, &EvaluationContext, &CancelToken) -> Result<Value, String> + Send + Sync,
{
    fn execute(
        &self,
        code: &str,
        context: &EvaluationContext,
        cancel: &CancelToken,
    ) -> Result<Value, String> {
        self(code, context, cancel)
    }
}

/// Default bound on worker threads alive at once, timed-out ones included.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Runs each execution on its own thread and stops waiting after the timeout.
///
/// A timed-out handler keeps running until it observes its `CancelToken`; its
/// late result is discarded. A handler that never checks the token holds its
/// thread until it returns, so live workers are capped: once
/// `max_in_flight` are running, further requests fail with
/// `RunnerError::Failed` without spawning. Clones share the same cap.
/// Handler panics are contained and reported as `RunnerError::Failed`.
#[derive(Clone)]
pub struct SandboxRunner {
    handlers: AHashMap<String, Arc<dyn ScriptHandler>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: usize,
}

impl Default for SandboxRunner {
    fn default() -> Self {
        Self {
            handlers: AHashMap::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// One reserved worker slot, released on drop.
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl SandboxRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bound on live worker threads. Zero is treated as one.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    /// Worker threads currently alive, including abandoned timed-out ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn acquire_slot(&self) -> Option<WorkerSlot> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot(Arc::clone(&self.in_flight)))
    }

    /// Registers a handler. Language names are matched case-insensitively.
    pub fn with_handler(mut self, language: &str, handler: impl ScriptHandler + 'static) -> Self {
        self.handlers
            .insert(language.to_ascii_lowercase(), Arc::new(handler));
        self
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl CodeRunner for SandboxRunner {
    fn run(
        &self,
        request: &CodeRequest<'_>,
        context: Arc<EvaluationContext>,
    ) -> Result<Value, RunnerError> {
        let handler = self
            .handlers
            .get(&request.language.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| RunnerError::UnsupportedLanguage(request.language.to_string()))?;

        let slot = self.acquire_slot().ok_or_else(|| {
            warn!(
                language = %request.language,
                max_in_flight = self.max_in_flight,
                "Custom code workers exhausted"
            );
            RunnerError::Failed(format!(
                "{} custom code workers are still running",
                self.max_in_flight
            ))
        })?;

        let (tx, rx) = mpsc::channel();
        let token = CancelToken::default();
        let worker_token = token.clone();
        let code = request.code.to_string();

        thread::Builder::new()
            .name(format!("custom-code-{}", request.language))
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    handler.execute(&code, &context, &worker_token)
                }));
                // Freed before sending so a caller that got its result can reuse the slot.
                drop(slot);
                // The receiver is gone if the caller already timed out.
                let _ = tx.send(result);
            })
            .map_err(|e| RunnerError::Failed(format!("could not start worker: {}", e)))?;

        let timeout_ms = request.timeout.as_millis() as u64;
        match rx.recv_timeout(request.timeout) {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(RunnerError::Failed(message)),
            Ok(Err(_)) => Err(RunnerError::Failed("handler panicked".to_string())),
            Err(RecvTimeoutError::Timeout) => {
                token.cancel();
                warn!(
                    language = %request.language,
                    timeout_ms,
                    "Custom code exceeded its time budget, cancelling"
                );
                Err(RunnerError::Timeout(timeout_ms))
            }
            Err(RecvTimeoutError::Disconnected) => Err(RunnerError::Failed(
                "handler exited without a result".to_string(),
            )),
        }
    }
}
