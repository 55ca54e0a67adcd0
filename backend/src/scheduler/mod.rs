//! Scheduling Module
//!
//! Recurring triggers, the batch-job orchestrator, and job status tracking.
//!
//! The orchestrator is an explicit object owning its triggers and their
//! last-fired state; it is constructed and torn down per test and is never a
//! process-wide singleton. Trigger evaluation is driven either by the
//! `run_polling_loop` task (production) or by calling `poll_due` directly
//! with an injected clock (tests).
//!
//! # Single-process guard
//!
//! The anti-double-fire guard is in-memory and per-process. Horizontally
//! scaled deployments need an external distributed lock or leader election;
//! that is outside this engine.

pub mod engine;
pub mod tracker;
pub mod triggers;

// Re-export main types for convenience
pub use engine::{BatchJobOrchestrator, SchedulerError, TriggerSpec};
pub use tracker::JobStatusTracker;
pub use triggers::Schedule;
