//! Best-effort compensation for multi-call operations.
//!
//! A [`Saga`] records every step that has been committed upstream together
//! with one closure that undoes it. When a later step fails, [`Saga::abort`]
//! runs the undo closures in reverse commit order and folds the original
//! error plus the outcome of every compensating call into one
//! [`ProviderError::PartialFailure`].
//!
//! Compensation is not transactional: a failing undo is reported as a
//! warning and the remaining undos still run.

use std::future::Future;
use std::pin::Pin;

use tracing::{info, warn};

use crate::client::FivetranError;
use crate::error::ProviderError;
use crate::schema::Diagnostic;

/// Boxed future returned by undo closures.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Undo<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<(), FivetranError>> + Send + 'a>;

struct Committed<'a> {
    description: String,
    undo: Undo<'a>,
}

/// Ordered log of committed steps and their compensations.
pub struct Saga<'a> {
    operation: String,
    committed: Vec<Committed<'a>>,
}

impl<'a> Saga<'a> {
    /// Start a saga for the named operation, e.g. "update group memberships".
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            committed: Vec::new(),
        }
    }

    /// Record a step that succeeded upstream and how to revert it.
    pub fn committed<F>(&mut self, description: impl Into<String>, undo: F)
    where
        F: FnOnce() -> BoxFuture<'a, Result<(), FivetranError>> + Send + 'a,
    {
        self.committed.push(Committed {
            description: description.into(),
            undo: Box::new(undo),
        });
    }

    /// Number of committed steps.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Whether nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Revert every committed step, newest first, and build the error
    /// reported to the host.
    pub async fn abort(self, failed_step: &str, error: ProviderError) -> ProviderError {
        let summary = format!("Failed to {}", self.operation);
        warn!(
            operation = %self.operation,
            step = %failed_step,
            committed = self.committed.len(),
            error = %error,
            "Step failed, compensating committed steps"
        );

        let mut diagnostics = vec![Diagnostic::error(summary.clone())
            .with_detail(format!("{} failed: {}", failed_step, error))];

        for step in self.committed.into_iter().rev() {
            match (step.undo)().await {
                Ok(()) => {
                    info!(step = %step.description, "Compensation succeeded");
                    diagnostics.push(
                        Diagnostic::warning(format!("Reverted: {}", step.description))
                            .with_detail("The change was rolled back after the failure above."),
                    );
                }
                Err(e) => {
                    warn!(step = %step.description, error = %e, "Compensation failed");
                    diagnostics.push(
                        Diagnostic::warning(format!("Could not revert: {}", step.description))
                            .with_detail(format!(
                                "{}. Upstream state may no longer match the recorded state; \
                                 run a refresh before the next apply.",
                                e
                            )),
                    );
                }
            }
        }

        ProviderError::PartialFailure {
            summary,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_abort_undoes_in_reverse_order() {
        let undone = Mutex::new(Vec::new());
        let mut saga = Saga::new("update memberships");

        for name in ["first", "second", "third"] {
            let undone = &undone;
            saga.committed(format!("add {}", name), move || {
                Box::pin(async move {
                    undone.lock().unwrap().push(name);
                    Ok::<(), FivetranError>(())
                })
            });
        }
        assert_eq!(saga.len(), 3);

        let err = saga
            .abort("add fourth", ProviderError::Validation("boom".into()))
            .await;

        assert_eq!(*undone.lock().unwrap(), vec!["third", "second", "first"]);
        match err {
            ProviderError::PartialFailure {
                summary,
                diagnostics,
            } => {
                assert_eq!(summary, "Failed to update memberships");
                assert_eq!(diagnostics.len(), 4);
                assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
                assert!(diagnostics[0]
                    .detail
                    .as_deref()
                    .unwrap_or_default()
                    .contains("add fourth failed"));
                assert!(diagnostics[1..]
                    .iter()
                    .all(|d| d.severity == DiagnosticSeverity::Warning));
            }
            other => panic!("expected PartialFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_compensation_is_a_warning() {
        let mut saga = Saga::new("delete memberships");
        saga.committed("remove conn_1", || {
            Box::pin(async {
                Err::<(), _>(FivetranError::Api {
                    status: 500,
                    code: "InternalError".into(),
                    message: "nope".into(),
                })
            })
        });

        let err = saga
            .abort("remove conn_2", ProviderError::Unavailable("down".into()))
            .await;
        let diagnostics = err.into_diagnostics();

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].severity, DiagnosticSeverity::Warning);
        assert_eq!(diagnostics[1].summary, "Could not revert: remove conn_1");
    }

    #[tokio::test]
    async fn test_abort_with_nothing_committed() {
        let saga = Saga::new("create memberships");
        assert!(saga.is_empty());

        let diagnostics = saga
            .abort("add conn_1", ProviderError::NotFound("conn_1".into()))
            .await
            .into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
    }
}
