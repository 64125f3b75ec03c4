//! Core business logic for Kontrakt.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Lifecycle machines, financial derivations and validation rules live here;
//! persistence and transactions live in `kontrakt-db`.
//!
//! # Modules
//!
//! - `deal` - Sales pipeline stages, probabilities and stage history
//! - `offer` - Offer phases, derived financials and order execution
//! - `project` - Project container phases
//! - `budget` - Budget line items and their aggregation
//! - `margin` - Margin, revenue and weighted value arithmetic
//! - `numbering` - Company prefixes and document number formatting
//! - `activity` - Audit trail entries
//! - `access` - Actors, roles and the ownership policy
//! - `settings` - Tunable lifecycle settings

pub mod access;
pub mod activity;
pub mod budget;
pub mod deal;
pub mod error;
pub mod margin;
pub mod numbering;
pub mod offer;
pub mod project;
pub mod settings;

pub use error::LifecycleError;
