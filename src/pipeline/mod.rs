//! Classification pipeline: the polling scheduler and the per-thread processor.

pub mod scheduler;
pub mod thread_processor;

pub use scheduler::{ClassificationScheduler, TickSummary};
pub use thread_processor::{ThreadOutcome, ThreadProcessor};
