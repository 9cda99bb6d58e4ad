//! # Fine-tuning of sentiment classifiers
//!
//! Every epoch runs a training pass (forward, cross-entropy on the logits, backward,
//! gradient norm clipping, AdamW step with decoupled weight decay, linear warmup schedule
//! step) followed by an evaluation pass without gradient tracking. The full var store is
//! saved at the end of the run.

mod config;
mod optimization;
mod trainer;

pub use config::TrainingConfig;
pub use optimization::{LinearWarmupSchedule, ParameterGroups, NO_DECAY_PATTERNS};
pub use trainer::{
    calculate_accuracy, process_batch, BatchOutput, EpochSummary, Phase, Trainer,
    TrainingReport, UpdateStep,
};
