//! Shared types, errors, configuration and collaborators for Kontrakt.
//!
//! This crate provides common building blocks used by the other crates:
//! - Money and currency types with decimal precision
//! - Typed IDs and the [`IdGenerator`] collaborator
//! - The injected [`Clock`]
//! - Application-wide error envelope
//! - Configuration management

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use types::{Currency, IdGenerator, Money, SequentialIdGenerator, UuidV7Generator};
