//! Concurrent orchestrator
//!
//! Runs analyzer units as tokio tasks under a unit semaphore. A unit that
//! errors, panics or misses the run deadline contributes nothing but a
//! `UnitFailure`; its siblings carry on. The registry client's own request
//! limiter is independent and shared by every unit.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};
use vine_core::VineError;

use crate::report::{FailureKind, MergedResult, UnitFailure, UnitReport};
use crate::unit::{AnalysisContext, AnalyzerUnit};

/// Default number of units running at once
pub const DEFAULT_UNIT_CONCURRENCY: usize = 3;

/// Progress notification for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProgressEvent {
    Started {
        unit: String,
        total: usize,
    },
    Finished {
        unit: String,
        completed: usize,
        total: usize,
        success: bool,
    },
}

/// Outcome of one spawned unit
enum UnitOutcome {
    Report(UnitReport),
    Failed(UnitFailure),
}

/// Runs analyzer units against one shared context
#[derive(Debug)]
pub struct Orchestrator {
    context: Arc<AnalysisContext>,
    concurrency: usize,
    timeout: Option<Duration>,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl Orchestrator {
    pub fn new(context: AnalysisContext) -> Self {
        Self {
            context: Arc::new(context),
            concurrency: DEFAULT_UNIT_CONCURRENCY,
            timeout: None,
            progress: None,
        }
    }

    /// Maximum units in flight (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run-level deadline; units still running when it passes are dropped
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `ProgressEvent`s to `sender`
    pub fn with_progress(mut self, sender: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Run every unit and merge what they produce
    pub async fn run(&self, units: Vec<Arc<dyn AnalyzerUnit>>) -> MergedResult {
        let total = units.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        // One entry per spawned unit; labels may repeat
        let mut pending: Vec<String> = units.iter().map(|unit| unit.label().to_string()).collect();

        info!(units = total, concurrency = self.concurrency, "starting analysis");

        let mut join_set = JoinSet::new();
        for unit in units {
            let context = Arc::clone(&self.context);
            let semaphore = Arc::clone(&semaphore);
            let progress = self.progress.clone();

            join_set.spawn(async move {
                let label = unit.label().to_string();
                let work = async {
                    let _permit = semaphore.acquire().await;
                    if let Some(progress) = &progress {
                        let _ = progress.send(ProgressEvent::Started {
                            unit: label.clone(),
                            total,
                        });
                    }
                    AssertUnwindSafe(unit.analyze(&context)).catch_unwind().await
                };

                let outcome = match deadline {
                    Some(deadline) => timeout_at(deadline, work).await.ok(),
                    None => Some(work.await),
                };
                let outcome = match outcome {
                    Some(Ok(Ok(report))) => UnitOutcome::Report(report),
                    Some(Ok(Err(error))) => UnitOutcome::Failed(UnitFailure {
                        unit: label.clone(),
                        kind: FailureKind::Error,
                        message: error.to_string(),
                    }),
                    Some(Err(panic)) => UnitOutcome::Failed(UnitFailure {
                        unit: label.clone(),
                        kind: FailureKind::Panic,
                        message: VineError::UnitFailed {
                            unit: label.clone(),
                            message: panic_message(panic.as_ref()),
                        }
                        .to_string(),
                    }),
                    None => UnitOutcome::Failed(UnitFailure {
                        unit: label.clone(),
                        kind: FailureKind::Timeout,
                        message: VineError::Timeout { unit: label.clone() }.to_string(),
                    }),
                };
                (label, outcome)
            });
        }

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        let mut completed = 0;

        while let Some(joined) = join_set.join_next().await {
            let (label, outcome) = match joined {
                Ok(result) => result,
                Err(error) => {
                    warn!(error = %error, "analyzer task aborted");
                    continue;
                },
            };

            let success = match outcome {
                UnitOutcome::Report(report) => {
                    reports.push(report);
                    true
                },
                UnitOutcome::Failed(failure) => {
                    warn!(unit = %failure.unit, kind = ?failure.kind, "{}", failure.message);
                    failures.push(failure);
                    false
                },
            };

            completed += 1;
            if let Some(index) = pending.iter().position(|spawned| *spawned == label) {
                pending.swap_remove(index);
            }
            if let Some(progress) = &self.progress {
                let _ = progress.send(ProgressEvent::Finished {
                    unit: label,
                    completed,
                    total,
                    success,
                });
            }
        }

        // Tasks that never reported back
        pending.sort();
        for label in pending {
            failures.push(UnitFailure {
                message: format!("Unit '{}' did not complete", label),
                unit: label,
                kind: FailureKind::Error,
            });
        }

        let merged = MergedResult::merge(reports, failures);
        info!(
            score = merged.score,
            findings = merged.findings.len(),
            failures = merged.failures.len(),
            "analysis complete"
        );
        merged
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
