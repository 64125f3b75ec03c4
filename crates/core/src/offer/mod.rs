//! Offers: from inquiry through order execution.
//!
//! # Modules
//!
//! - `types` - Offer, phase, status, health, execution tracking, warnings
//! - `machine` - Transition table and phase entry actions
//! - `service` - Creation, financial and execution updates

pub mod machine;
pub mod service;
pub mod types;

#[cfg(test)]
mod machine_props;

pub use machine::{OFFER_TRANSITIONS, OfferPhaseMachine, PhaseChange, PhaseContext};
pub use service::{DEFAULT_OFFER_PROBABILITY, NewOffer, OfferService, OrderProgress};
pub use types::{
    Offer, OfferHealth, OfferPhase, OfferStatus, OfferWarning, OrderExecution, WarehouseFigures,
};
