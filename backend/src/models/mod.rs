//! Domain models for the late-fee engine

pub mod job;
pub mod policy;
pub mod record;

// Re-exports
pub use job::{BatchJob, BatchOptions, JobStatus, RecordError};
pub use policy::{
    AutomationConfig, CalculationType, Compounding, CompoundingInterval, ConfigScope, FeePolicy,
    GeneralConfig, GracePeriod, InstitutionConfig, SystemMeta, TierMatching, TierRule,
};
pub use record::{AppliedCharge, OverdueFeeRecord};
