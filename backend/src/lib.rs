//! Tuition Late-Fee Engine - Rust Core
//!
//! Computes and automatically applies late-payment fees for overdue tuition
//! and enrollment charges across the campuses of an institution.
//!
//! # Architecture
//!
//! - **core**: Clock abstraction, billing periods, fee calendar
//! - **models**: Domain types (FeePolicy, OverdueFeeRecord, BatchJob)
//! - **fees**: Pure late-fee calculation with audit breakdown
//! - **config**: Per-scope policy documents (load, merge, validate)
//! - **batch**: Per-campus batch processing of overdue records
//! - **scheduler**: Recurring triggers, bounded fan-out, job tracking
//! - **repo**: External collaborator traits + in-memory adapters
//! - **service**: In-process facade consumed by the hosting application
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. The calculator is pure and total: no I/O, no failure on valid input
//! 3. At most one applied charge per (enrollment fee, billing period)
//! 4. A batch run works against one immutable policy snapshot

// Module declarations
pub mod batch;
pub mod config;
pub mod core;
pub mod fees;
pub mod models;
pub mod repo;
pub mod scheduler;
pub mod service;

// Re-exports for convenience
pub use batch::{BatchError, BatchOutcome, CampusBatchProcessor, ChargePreview};
pub use config::{ConfigError, ConfigSection, PolicyConfigStore, Violation};
pub use core::calendar::fees_apply_on;
pub use core::clock::{days_overdue, BillingPeriod, Clock, FixedClock, SystemClock};
pub use fees::{calculate, BreakdownEntry, LateFeeResult};
pub use models::{
    job::{BatchJob, BatchOptions, JobStatus, RecordError},
    policy::{
        CalculationType, Compounding, CompoundingInterval, ConfigScope, FeePolicy, GracePeriod,
        InstitutionConfig, TierMatching, TierRule,
    },
    record::{AppliedCharge, OverdueFeeRecord},
};
pub use repo::{CampusDirectory, FeeRecordRepository, PolicyConfigRepository, RepositoryError};
pub use scheduler::{
    BatchJobOrchestrator, JobStatusTracker, Schedule, SchedulerError, TriggerSpec,
};
pub use service::{JobOptions, LateFeeService, ServiceSettings};
