//! Compensation ledger for multi-step order placement.
//!
//! Each forward step that succeeds pushes its undo action; on failure
//! the ledger unwinds in reverse order. Unwinding is best-effort per
//! step: a compensation that fails is logged and the remaining steps
//! still run, so one broken undo never strands the others.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::domain::products::ProductsService;

/// Result type for compensating actions.
pub type CompensationResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A single compensating action recorded after a forward step.
#[async_trait]
pub trait Compensation: Send + Sync {
    /// Short label used when a failed unwind is logged.
    fn describe(&self) -> String;

    /// Undo the forward step this action was recorded for.
    async fn compensate(&self) -> CompensationResult;
}

/// Ordered list of compensating actions, unwound in reverse.
#[derive(Default)]
pub struct Saga {
    steps: Vec<Box<dyn Compensation>>,
}

impl Saga {
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Record the undo action for a forward step that just succeeded.
    pub fn push(&mut self, step: Box<dyn Compensation>) {
        self.steps.push(step);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every recorded compensation, newest first. Returns the
    /// number of steps that failed.
    pub async fn unwind(mut self) -> usize {
        let mut failed = 0;

        while let Some(step) = self.steps.pop() {
            if let Err(error) = step.compensate().await {
                failed += 1;

                warn!(
                    step = %step.describe(),
                    %error,
                    "compensation failed during rollback"
                );
            }
        }

        failed
    }

    /// Drop all recorded compensations; the forward steps stand.
    pub fn complete(mut self) {
        self.steps.clear();
    }
}

/// Undo for one successful stock reservation.
pub(crate) struct RestoreStock {
    pub products: Arc<dyn ProductsService>,
    pub product: Uuid,
    pub quantity: u32,
}

#[async_trait]
impl Compensation for RestoreStock {
    fn describe(&self) -> String {
        format!("restore {} units of product {}", self.quantity, self.product)
    }

    async fn compensate(&self) -> CompensationResult {
        self.products
            .restore_stock(self.product, self.quantity)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Compensation for Recorder {
        fn describe(&self) -> String {
            self.label.to_string()
        }

        async fn compensate(&self) -> CompensationResult {
            self.log
                .lock()
                .map_err(|_| "log poisoned")?
                .push(self.label);

            if self.fail {
                return Err("deliberate failure".into());
            }

            Ok(())
        }
    }

    fn recorder(
        label: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Box<dyn Compensation> {
        Box::new(Recorder {
            label,
            log: Arc::clone(log),
            fail,
        })
    }

    #[tokio::test]
    async fn unwind_runs_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new();

        saga.push(recorder("first", &log, false));
        saga.push(recorder("second", &log, false));
        saga.push(recorder("third", &log, false));

        let failed = saga.unwind().await;

        assert_eq!(failed, 0);
        assert_eq!(
            log.lock().expect("log poisoned").as_slice(),
            ["third", "second", "first"]
        );
    }

    #[tokio::test]
    async fn unwind_continues_past_a_failing_step() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new();

        saga.push(recorder("first", &log, false));
        saga.push(recorder("second", &log, true));
        saga.push(recorder("third", &log, false));

        let failed = saga.unwind().await;

        assert_eq!(failed, 1);
        assert_eq!(
            log.lock().expect("log poisoned").as_slice(),
            ["third", "second", "first"]
        );
    }

    #[tokio::test]
    async fn complete_drops_compensations_without_running_them() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new();

        saga.push(recorder("first", &log, false));

        assert_eq!(saga.len(), 1);

        saga.complete();

        assert!(log.lock().expect("log poisoned").is_empty());
    }
}
