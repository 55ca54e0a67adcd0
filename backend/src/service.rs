//! In-process facade for the hosting application
//!
//! Wires the configuration store, calculator, batch processor, orchestrator
//! and job tracker behind the operations the surrounding application (API
//! layer, admin surface) consumes. No wire protocol is defined here; the
//! engine is invoked in-process.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use crate::batch::{BatchError, BatchOutcome, CampusBatchProcessor};
use crate::config::{ConfigError, ConfigSection, PolicyConfigStore};
use crate::core::clock::Clock;
use crate::fees::{self, LateFeeResult};
use crate::models::job::{BatchJob, BatchOptions};
use crate::models::policy::{ConfigScope, InstitutionConfig};
use crate::repo::{
    CampusDirectory, FeeRecordRepository, PolicyConfigRepository, RepositoryError,
};
use crate::scheduler::engine::{BatchJobOrchestrator, SchedulerError, TriggerSpec};
use crate::scheduler::tracker::JobStatusTracker;

/// Engine-level settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Maximum concurrent campus runs
    pub worker_pool_size: usize,

    /// Trigger evaluation resolution for the polling loop
    pub poll_resolution: StdDuration,

    /// Retention window for terminal jobs
    pub job_retention: chrono::Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            poll_resolution: StdDuration::from_secs(60),
            job_retention: chrono::Duration::hours(24),
        }
    }
}

/// Options for starting one automated campus job
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub campus_id: String,
    pub dry_run: bool,
    pub batch_size: usize,
    pub max_retries: u32,
}

impl JobOptions {
    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            dry_run: self.dry_run,
            batch_size: self.batch_size,
            max_retries: self.max_retries,
        }
    }
}

/// The late-fee engine facade
pub struct LateFeeService {
    config: Arc<PolicyConfigStore>,
    processor: Arc<CampusBatchProcessor>,
    orchestrator: Arc<BatchJobOrchestrator>,
    tracker: JobStatusTracker,
    campuses: Arc<dyn CampusDirectory>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl LateFeeService {
    pub fn new(
        records: Arc<dyn FeeRecordRepository>,
        campuses: Arc<dyn CampusDirectory>,
        config_repo: Arc<dyn PolicyConfigRepository>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        let config = Arc::new(PolicyConfigStore::new(config_repo, Arc::clone(&clock)));
        let tracker = JobStatusTracker::with_retention(settings.job_retention);
        let processor = Arc::new(CampusBatchProcessor::new(
            records,
            Arc::clone(&config),
            tracker.clone(),
            Arc::clone(&clock),
        ));
        let orchestrator = Arc::new(BatchJobOrchestrator::new(
            Arc::clone(&campuses),
            Arc::clone(&processor),
            tracker.clone(),
            Arc::clone(&clock),
            settings.worker_pool_size,
        ));
        Self {
            config,
            processor,
            orchestrator,
            tracker,
            campuses,
            clock,
            settings,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub async fn get_configuration(
        &self,
        scope: &ConfigScope,
    ) -> Result<InstitutionConfig, ConfigError> {
        self.config.get_configuration(scope).await
    }

    pub async fn update_configuration(
        &self,
        partial: Value,
        scope: &ConfigScope,
        updated_by: &str,
    ) -> Result<InstitutionConfig, ConfigError> {
        self.config
            .update_configuration(partial, scope, updated_by)
            .await
    }

    pub async fn get_configuration_section(
        &self,
        scope: &ConfigScope,
        section: ConfigSection,
    ) -> Result<Value, ConfigError> {
        self.config.get_section(scope, section).await
    }

    pub async fn update_configuration_section(
        &self,
        scope: &ConfigScope,
        section: ConfigSection,
        value: Value,
        updated_by: &str,
    ) -> Result<InstitutionConfig, ConfigError> {
        self.config
            .update_section(scope, section, value, updated_by)
            .await
    }

    // ========================================================================
    // Fee preview
    // ========================================================================

    /// Synchronous fee preview against the scope's resolved policy
    ///
    /// Total: edge inputs (zero principal, zero days) produce a zero result,
    /// and a configuration read failure degrades to the system default
    /// policy rather than erroring.
    pub async fn calculate_late_fee(
        &self,
        principal: i64,
        days_overdue: u32,
        scope: &ConfigScope,
    ) -> LateFeeResult {
        let policy = match self.config.get_configuration(scope).await {
            Ok(document) => document.late_fees,
            Err(err) => {
                warn!(error = %err, "preview falling back to default policy");
                InstitutionConfig::system_default(self.clock.now()).late_fees
            }
        };
        fees::calculate(principal, days_overdue, &policy)
    }

    // ========================================================================
    // Automation
    // ========================================================================

    /// Start one tracked batch job for a campus; poll `job_status` for the
    /// outcome
    pub async fn start_automated_job(&self, options: JobOptions) -> Uuid {
        let batch_options = options.batch_options();
        let job_id = self
            .tracker
            .start_job(&options.campus_id, &batch_options, self.clock.now())
            .await;

        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            // The processor owns all job transitions from here
            let _ = processor
                .process_campus(&options.campus_id, &batch_options, Some(job_id))
                .await;
        });
        job_id
    }

    /// Run one campus synchronously, without a tracked job
    pub async fn run_campus_now(
        &self,
        campus_id: &str,
        options: &BatchOptions,
    ) -> Result<BatchOutcome, BatchError> {
        self.processor.process_campus(campus_id, options, None).await
    }

    /// Run every active campus once, concurrently, without tracked jobs
    ///
    /// Per-campus failures are reported in the returned pairs; one campus
    /// failing never stops the others.
    pub async fn run_all_campuses_now(
        &self,
        options: &BatchOptions,
    ) -> Result<Vec<(String, Result<BatchOutcome, BatchError>)>, RepositoryError> {
        let campuses = self.campuses.list_active_campuses().await?;
        let runs = campuses.into_iter().map(|campus_id| {
            let processor = Arc::clone(&self.processor);
            let options = options.clone();
            async move {
                let result = processor.process_campus(&campus_id, &options, None).await;
                (campus_id, result)
            }
        });
        Ok(futures::future::join_all(runs).await)
    }

    /// Register the recurring sweep configured in the scope's automation
    /// settings; returns false when automation is disabled for the scope
    pub async fn enable_automation(
        &self,
        scope: &ConfigScope,
        trigger_name: &str,
    ) -> Result<bool, ConfigError> {
        let policy = self.config.get_configuration(scope).await?.late_fees;
        if !policy.automation.auto_apply {
            return Ok(false);
        }
        let spec = TriggerSpec {
            name: trigger_name.to_string(),
            schedule: policy.automation.schedule,
            options: BatchOptions {
                dry_run: false,
                ..BatchOptions::default()
            },
            dry_run_first: policy.automation.dry_run_first,
        };
        match self.orchestrator.register_trigger(spec).await {
            Ok(_) => Ok(true),
            Err(SchedulerError::DuplicateTrigger(name)) => {
                warn!(trigger = %name, "automation already enabled");
                Ok(true)
            }
            Err(SchedulerError::InvalidSchedule(message)) => {
                Err(ConfigError::Validation(vec![crate::config::Violation {
                    path: "late_fees.automation.schedule".to_string(),
                    message,
                }]))
            }
        }
    }

    pub async fn job_status(&self, id: Uuid) -> Option<BatchJob> {
        self.tracker.job_status(id).await
    }

    /// Bounded wait for a job's terminal state; `None` on timeout (the job
    /// itself keeps running)
    pub async fn wait_for_job(&self, id: Uuid, timeout: StdDuration) -> Option<BatchJob> {
        self.tracker.wait_for_completion(id, timeout).await
    }

    /// Spawn the scheduler polling loop at the configured resolution
    pub fn start_scheduler(&self) -> JoinHandle<()> {
        Arc::clone(&self.orchestrator).run_polling_loop(self.settings.poll_resolution)
    }

    /// Clear every scheduled trigger; in-flight runs finish cooperatively
    pub async fn stop_all_scheduled_jobs(&self) {
        self.orchestrator.stop_all().await;
    }

    /// Direct access to the orchestrator (tests drive `poll_due` manually)
    pub fn orchestrator(&self) -> &Arc<BatchJobOrchestrator> {
        &self.orchestrator
    }

    /// Direct access to the job tracker
    pub fn tracker(&self) -> &JobStatusTracker {
        &self.tracker
    }
}
