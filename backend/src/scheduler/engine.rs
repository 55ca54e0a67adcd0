//! Batch job orchestrator
//!
//! Owns the registered triggers and launches bounded-concurrency campus runs
//! when they fire. Evaluation is a monotonic min-heap of next-fire times:
//! `poll_due` pops everything due at "now", fires it (guarded against
//! double-firing within a period), and pushes the next occurrence.
//!
//! Cancellation is cooperative: `stop_all` clears the triggers so nothing new
//! is scheduled, but in-flight campus runs complete on their own.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::batch::CampusBatchProcessor;
use crate::core::clock::Clock;
use crate::models::job::BatchOptions;
use crate::repo::CampusDirectory;
use crate::scheduler::tracker::JobStatusTracker;
use crate::scheduler::triggers::Schedule;

/// Scheduler errors
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("a trigger named '{0}' is already registered")]
    DuplicateTrigger(String),
}

/// A named recurring trigger
#[derive(Debug, Clone)]
pub struct TriggerSpec {
    /// Unique trigger name; also keys the per-campus reentrancy guard
    pub name: String,

    pub schedule: Schedule,

    /// Options for the runs this trigger launches
    pub options: BatchOptions,

    /// Run a dry pass first and skip the live pass if it reports errors
    pub dry_run_first: bool,
}

struct TriggerState {
    spec: TriggerSpec,
    next_fire: DateTime<Utc>,
    last_fired_period: Option<String>,
}

#[derive(Default)]
struct OrchestratorState {
    triggers: HashMap<String, TriggerState>,

    /// Min-heap of (next fire time, trigger name). Entries go stale when a
    /// trigger is removed or re-registered; `poll_due` drops entries whose
    /// fire time no longer matches the trigger's recorded one.
    queue: BinaryHeap<Reverse<(DateTime<Utc>, String)>>,

    /// Reentrancy guard: (campus, trigger) pairs with a run in flight
    in_flight: HashSet<(String, String)>,
}

/// Fires triggers and fans out campus batch runs under bounded concurrency
///
/// The anti-double-fire guard is in-memory and local to this instance;
/// horizontally scaled deployments need an external distributed lock.
pub struct BatchJobOrchestrator {
    campuses: Arc<dyn CampusDirectory>,
    processor: Arc<CampusBatchProcessor>,
    tracker: JobStatusTracker,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<OrchestratorState>>,
    worker_pool: Arc<Semaphore>,
    active: Arc<AtomicBool>,
}

impl BatchJobOrchestrator {
    pub fn new(
        campuses: Arc<dyn CampusDirectory>,
        processor: Arc<CampusBatchProcessor>,
        tracker: JobStatusTracker,
        clock: Arc<dyn Clock>,
        worker_pool_size: usize,
    ) -> Self {
        assert!(worker_pool_size > 0, "worker pool must have at least one slot");
        Self {
            campuses,
            processor,
            tracker,
            clock,
            state: Arc::new(Mutex::new(OrchestratorState::default())),
            worker_pool: Arc::new(Semaphore::new(worker_pool_size)),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a named recurring trigger; returns its first fire time
    pub async fn register_trigger(
        &self,
        spec: TriggerSpec,
    ) -> Result<DateTime<Utc>, SchedulerError> {
        spec.schedule
            .validate()
            .map_err(SchedulerError::InvalidSchedule)?;

        let next_fire = spec.schedule.next_fire_after(self.clock.now());
        let mut state = self.state.lock().await;
        if state.triggers.contains_key(&spec.name) {
            return Err(SchedulerError::DuplicateTrigger(spec.name.clone()));
        }
        info!(trigger = %spec.name, %next_fire, "trigger registered");
        state
            .queue
            .push(Reverse((next_fire, spec.name.clone())));
        state.triggers.insert(
            spec.name.clone(),
            TriggerState {
                spec,
                next_fire,
                last_fired_period: None,
            },
        );
        Ok(next_fire)
    }

    /// Names of currently registered triggers
    pub async fn registered_triggers(&self) -> Vec<String> {
        self.state.lock().await.triggers.keys().cloned().collect()
    }

    /// Evaluate every trigger due at `now`, launching campus runs for each
    /// one that fires. Returns the ids of the jobs launched.
    ///
    /// Driven by `run_polling_loop` in production and called directly with a
    /// test clock in tests.
    pub async fn poll_due(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let due = {
            let mut state = self.state.lock().await;
            let mut due = Vec::new();

            while let Some(Reverse((fire_at, name))) = state.queue.peek().cloned() {
                if fire_at > now {
                    break;
                }
                state.queue.pop();

                let Some(trigger) = state.triggers.get_mut(&name) else {
                    continue; // stale entry for a removed trigger
                };
                if trigger.next_fire != fire_at {
                    continue; // stale entry for a re-registered trigger
                }

                let period = trigger.spec.schedule.period_key(now);
                let fires = trigger.last_fired_period.as_deref() != Some(period.as_str());
                if fires {
                    trigger.last_fired_period = Some(period);
                } else {
                    debug!(trigger = %name, period = %period, "already fired this period, skipping");
                }

                trigger.next_fire = trigger.spec.schedule.next_fire_after(now);
                let rescheduled = trigger.next_fire;
                let fired_spec = fires.then(|| trigger.spec.clone());
                state.queue.push(Reverse((rescheduled, name.clone())));

                if let Some(spec) = fired_spec {
                    due.push(spec);
                }
            }
            due
        };

        let mut launched = Vec::new();
        for spec in due {
            launched.extend(self.fire_trigger(&spec, now).await);
        }
        launched
    }

    /// Clear all registered triggers
    ///
    /// In-flight batch runs are not interrupted; they complete cooperatively
    /// and simply stop being rescheduled.
    pub async fn stop_all(&self) {
        self.active.store(false, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        let cleared = state.triggers.len();
        state.triggers.clear();
        state.queue.clear();
        info!(cleared, "scheduled triggers stopped; in-flight runs continue");
    }

    /// Spawn the production polling loop at the given resolution
    ///
    /// The loop re-evaluates `poll_due` each tick and prunes expired jobs.
    /// It exits after `stop_all`.
    pub fn run_polling_loop(self: Arc<Self>, resolution: StdDuration) -> JoinHandle<()> {
        let orchestrator = self;
        orchestrator.active.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(resolution);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !orchestrator.active.load(Ordering::SeqCst) {
                    break;
                }
                let now = orchestrator.clock.now();
                orchestrator.poll_due(now).await;
                orchestrator.tracker.prune_expired(now).await;
            }
            debug!("scheduler polling loop stopped");
        })
    }

    /// Launch one run per active campus for a fired trigger
    async fn fire_trigger(&self, spec: &TriggerSpec, now: DateTime<Utc>) -> Vec<Uuid> {
        let campuses = match self.campuses.list_active_campuses().await {
            Ok(campuses) => campuses,
            Err(err) => {
                error!(trigger = %spec.name, error = %err, "could not enumerate campuses");
                return Vec::new();
            }
        };
        info!(trigger = %spec.name, campuses = campuses.len(), "trigger fired");

        let mut job_ids = Vec::new();
        for campus_id in campuses {
            let guard_key = (campus_id.clone(), spec.name.clone());
            {
                let mut state = self.state.lock().await;
                if !state.in_flight.insert(guard_key.clone()) {
                    warn!(
                        campus_id = %campus_id,
                        trigger = %spec.name,
                        "previous run still in flight, skipping campus"
                    );
                    continue;
                }
            }

            let job_id = self.tracker.start_job(&campus_id, &spec.options, now).await;
            job_ids.push(job_id);

            let processor = Arc::clone(&self.processor);
            let tracker = self.tracker.clone();
            let clock = Arc::clone(&self.clock);
            let state = Arc::clone(&self.state);
            let pool = Arc::clone(&self.worker_pool);
            let options = spec.options.clone();
            let dry_run_first = spec.dry_run_first;
            tokio::spawn(async move {
                // Bounded fan-out: hold one pool slot for the whole run
                let Ok(_permit) = pool.acquire_owned().await else {
                    state.lock().await.in_flight.remove(&guard_key);
                    return;
                };
                run_campus(processor, tracker, clock, &guard_key.0, options, dry_run_first, job_id)
                    .await;
                state.lock().await.in_flight.remove(&guard_key);
            });
        }
        job_ids
    }
}

/// One campus run, with an optional dry precheck before the live pass
async fn run_campus(
    processor: Arc<CampusBatchProcessor>,
    tracker: JobStatusTracker,
    clock: Arc<dyn Clock>,
    campus_id: &str,
    options: BatchOptions,
    dry_run_first: bool,
    job_id: Uuid,
) {
    if dry_run_first && !options.dry_run {
        let mut probe = options.clone();
        probe.dry_run = true;
        match processor.process_campus(campus_id, &probe, None).await {
            Ok(outcome) if outcome.errors.is_empty() => {}
            Ok(outcome) => {
                warn!(
                    campus_id,
                    errors = outcome.errors.len(),
                    "dry-run precheck reported errors; skipping live pass"
                );
                tracker
                    .fail(
                        job_id,
                        format!(
                            "dry-run precheck reported {} record error(s)",
                            outcome.errors.len()
                        ),
                        clock.now(),
                    )
                    .await;
                return;
            }
            // Let the live pass hit the same infrastructure failure and fail
            // the tracked job through the normal path
            Err(err) => warn!(campus_id, error = %err, "dry-run precheck failed"),
        }
    }

    if let Err(err) = processor
        .process_campus(campus_id, &options, Some(job_id))
        .await
    {
        error!(campus_id, error = %err, "campus batch run failed");
    }
}
