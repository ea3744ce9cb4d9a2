// src/exec/handle.rs

use tokio::sync::oneshot;

use crate::config::DescriptorId;
use crate::errors::TransformError;
use crate::transform::TransformSummary;

/// Observable state of one in-flight transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleState {
    Pending,
    Succeeded,
    Failed(String),
}

/// Final result of one execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub descriptor: DescriptorId,
    pub module: String,
    pub result: Result<TransformSummary, TransformError>,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Handle for a single transform execution, owned by whoever requested it.
///
/// Resolves exactly once. If the completing side is dropped without
/// reporting, the handle resolves as failed.
#[derive(Debug)]
pub struct ExecutionHandle {
    descriptor: DescriptorId,
    module: String,
    state: HandleState,
    rx: Option<oneshot::Receiver<Result<TransformSummary, TransformError>>>,
    outcome: Option<Result<TransformSummary, TransformError>>,
}

/// Completing side of an [`ExecutionHandle`].
#[derive(Debug)]
pub struct HandleCompleter {
    tx: oneshot::Sender<Result<TransformSummary, TransformError>>,
}

impl HandleCompleter {
    pub fn complete(self, result: Result<TransformSummary, TransformError>) {
        // The handle may already be gone; nobody is waiting then.
        let _ = self.tx.send(result);
    }
}

impl ExecutionHandle {
    pub fn pending(descriptor: DescriptorId, module: impl Into<String>) -> (Self, HandleCompleter) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            descriptor,
            module: module.into(),
            state: HandleState::Pending,
            rx: Some(rx),
            outcome: None,
        };
        (handle, HandleCompleter { tx })
    }

    pub fn descriptor(&self) -> DescriptorId {
        self.descriptor
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Poll without blocking.
    pub fn state(&mut self) -> HandleState {
        if let Some(rx) = self.rx.as_mut() {
            match rx.try_recv() {
                Ok(result) => self.settle(result),
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.settle(Err(self.dropped())),
            }
        }
        self.state.clone()
    }

    /// Wait for the execution to finish.
    pub async fn wait(mut self) -> ExecutionOutcome {
        if let Some(rx) = self.rx.take() {
            let result = match rx.await {
                Ok(result) => result,
                Err(_) => Err(self.dropped()),
            };
            self.outcome = Some(result);
        }

        let result = match self.outcome.take() {
            Some(result) => result,
            None => Err(self.dropped()),
        };

        ExecutionOutcome {
            descriptor: self.descriptor,
            module: self.module,
            result,
        }
    }

    fn settle(&mut self, result: Result<TransformSummary, TransformError>) {
        self.state = match &result {
            Ok(_) => HandleState::Succeeded,
            Err(e) => HandleState::Failed(e.reason.clone()),
        };
        self.rx = None;
        self.outcome = Some(result);
    }

    fn dropped(&self) -> TransformError {
        TransformError {
            descriptor: self.descriptor,
            module: self.module.clone(),
            reason: "execution ended without reporting a result".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransformKind;

    fn id() -> DescriptorId {
        DescriptorId {
            module: 0,
            kind: TransformKind::Static,
            index: 0,
        }
    }

    #[tokio::test]
    async fn state_moves_from_pending_to_succeeded() {
        let (mut handle, completer) = ExecutionHandle::pending(id(), "core");
        assert_eq!(handle.state(), HandleState::Pending);

        completer.complete(Ok(TransformSummary::default()));
        assert_eq!(handle.state(), HandleState::Succeeded);
        assert!(handle.wait().await.is_success());
    }

    #[tokio::test]
    async fn dropped_completer_fails_the_handle() {
        let (mut handle, completer) = ExecutionHandle::pending(id(), "core");
        drop(completer);

        assert!(matches!(handle.state(), HandleState::Failed(_)));
        let outcome = handle.wait().await;
        assert!(!outcome.is_success());
    }
}
