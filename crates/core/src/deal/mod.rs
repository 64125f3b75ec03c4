//! Deal pipeline: stages, probabilities and the stage machine.
//!
//! # Modules
//!
//! - `types` - Deal, stage, loss category, history row, probability table
//! - `machine` - Transition table and stage operations (advance, win, lose, reopen)
//! - `service` - Creation and detail edits

pub mod machine;
pub mod service;
pub mod types;

#[cfg(test)]
mod machine_props;

pub use machine::{DEAL_TRANSITIONS, DealStageMachine, StageChange};
pub use service::{DealChanges, DealService, NewDeal};
pub use types::{Deal, DealStage, DealStageHistory, LossReasonCategory, ProbabilityTable};
