//! Task Orchestrator: concurrent provider fan-out under one deadline
//!
//! Every task is polled on the caller's task, so no two tasks run between
//! the same pair of suspension points. Each task owns exactly one result
//! slot; anything still pending at the deadline is abandoned and recorded
//! as `Timeout`.
use crate::context::GenerationContext;
use crate::error::GuideError;
use crate::progress::{ProgressReporter, ProgressStage};
use crate::provider::{FailureKind, ProviderRegistry, ProviderResult, ProviderTask};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Progress window the fan-out reports into
const PROGRESS_START: u8 = 20;
const PROGRESS_END: u8 = 70;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub result: ProviderResult,
    pub latency: Duration,
}

/// Joined results of one `run_all` call
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: BTreeMap<String, TaskRecord>,
    pub elapsed: Duration,
    pub deadline_hit: bool,
}

impl BatchOutcome {
    pub fn result(&self, name: &str) -> Option<&ProviderResult> {
        self.records.get(name).map(|r| &r.result)
    }

    /// Name → result view, the shape downstream merging consumes
    pub fn results(&self) -> BTreeMap<String, ProviderResult> {
        self.records
            .iter()
            .map(|(name, record)| (name.clone(), record.result.clone()))
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.records.values().filter(|r| r.result.is_success()).count()
    }

    /// Fails with the first critical task (in task order) that did not succeed
    pub fn ensure_critical(&self, tasks: &[ProviderTask]) -> Result<(), GuideError> {
        for task in tasks.iter().filter(|t| t.critical) {
            match self.result(&task.name) {
                Some(result) if result.is_success() => {}
                Some(result) => {
                    return Err(GuideError::CriticalProviderFailure {
                        provider: task.name.clone(),
                        cause: result.to_string(),
                    })
                }
                None => {
                    return Err(GuideError::CriticalProviderFailure {
                        provider: task.name.clone(),
                        cause: "no result recorded".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

pub struct TaskOrchestrator {
    registry: ProviderRegistry,
}

impl TaskOrchestrator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn run_all(
        &self,
        ctx: &GenerationContext,
        tasks: &[ProviderTask],
        deadline: Duration,
        progress: &ProgressReporter,
    ) -> BatchOutcome {
        let started = Instant::now();
        let deadline_at = started + deadline;
        let mut records: BTreeMap<String, TaskRecord> = BTreeMap::new();
        let mut pending = FuturesUnordered::new();

        for task in tasks {
            let Some(provider) = self.registry.get(&task.name) else {
                warn!(provider = %task.name, "no provider registered for task");
                records.insert(
                    task.name.clone(),
                    TaskRecord {
                        result: ProviderResult::failure(
                            FailureKind::Disabled,
                            format!("provider '{}' is not registered", task.name),
                        ),
                        latency: Duration::ZERO,
                    },
                );
                continue;
            };

            let name = task.name.clone();
            let timeout = task.timeout;
            pending.push(async move {
                let begun = Instant::now();
                let call = tokio::time::timeout(timeout, provider.fetch(ctx));
                let result = match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(Ok(result)) => result,
                    Ok(Err(_elapsed)) => ProviderResult::Timeout,
                    Err(_panic) => {
                        ProviderResult::failure(FailureKind::Internal, "provider task panicked")
                    }
                };
                (name, result, begun.elapsed())
            });
        }

        let total = pending.len().max(1);
        let mut completed = 0usize;
        let mut deadline_hit = false;

        loop {
            match tokio::time::timeout_at(deadline_at, pending.next()).await {
                Ok(Some((name, result, latency))) => {
                    completed += 1;
                    debug!(
                        provider = %name,
                        outcome = %result.outcome_label(),
                        elapsed_ms = latency.as_millis() as u64,
                        "provider task finished"
                    );
                    let span = (PROGRESS_END - PROGRESS_START) as usize;
                    let percent = PROGRESS_START as usize + span * completed / total;
                    progress.report(
                        percent as u8,
                        ProgressStage::Fetching,
                        format!("{} provider: {}", name, result.outcome_label()),
                    );
                    records.insert(name, TaskRecord { result, latency });
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    warn!(
                        outstanding = pending.len(),
                        deadline_ms = deadline.as_millis() as u64,
                        "deadline reached, abandoning outstanding provider tasks"
                    );
                    break;
                }
            }
        }
        // Dropping the set abandons whatever is still in flight
        drop(pending);

        let elapsed = started.elapsed();
        for task in tasks {
            records.entry(task.name.clone()).or_insert(TaskRecord {
                result: ProviderResult::Timeout,
                latency: elapsed,
            });
        }

        let outcome = BatchOutcome {
            records,
            elapsed,
            deadline_hit,
        };
        info!(
            request_id = %ctx.request_id,
            succeeded = outcome.success_count(),
            total = tasks.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "provider fan-out joined"
        );
        outcome
    }
}
