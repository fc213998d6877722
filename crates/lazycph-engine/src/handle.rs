//! Background runs that a UI can poll or cancel.

use crate::cancel::CancelToken;
use crate::error::ExecutionError;
use crate::ExecutionResult;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

/// One in-flight execution on its own thread.
///
/// Dropping the handle detaches the worker: the run still finishes (or times
/// out) and its artifact is still removed.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelToken,
    rx: Receiver<ExecutionResult>,
    worker: Option<JoinHandle<()>>,
    result: Option<ExecutionResult>,
}

impl RunHandle {
    /// Start `job` on a worker thread with a fresh cancel token.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce(&CancelToken) -> ExecutionResult + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::spawn(move || {
            let result = job(&token);
            // Receiver gone means the handle was dropped; nothing to report to.
            let _ = tx.send(result);
        });
        Self {
            cancel,
            rx,
            worker: Some(worker),
            result: None,
        }
    }

    /// Ask the run to stop. It ends with `ExecutionError::Cancelled` unless it
    /// had already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Non-blocking: true once a result is available.
    pub fn is_finished(&mut self) -> bool {
        self.poll();
        self.result.is_some()
    }

    /// Non-blocking: the result if the run has finished. The result stays
    /// available for [`wait`](Self::wait).
    pub fn try_result(&mut self) -> Option<&ExecutionResult> {
        self.poll();
        self.result.as_ref()
    }

    /// Block until the run finishes.
    pub fn wait(mut self) -> ExecutionResult {
        if let Some(result) = self.result.take() {
            return result;
        }
        let received = self.rx.recv();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                return Err(ExecutionError::Unknown("execution worker panicked".to_string()));
            }
        }
        received.unwrap_or_else(|_| {
            Err(ExecutionError::Unknown(
                "execution worker exited without a result".to_string(),
            ))
        })
    }

    fn poll(&mut self) {
        if self.result.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(result) => self.result = Some(result),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.result = Some(Err(ExecutionError::Unknown(
                    "execution worker panicked".to_string(),
                )));
            }
        }
    }
}
