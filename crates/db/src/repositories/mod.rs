//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every mutating operation runs in a single database transaction.

pub mod activity;
pub mod budget_item;
pub mod customer;
pub mod deal;
pub mod lifecycle;
pub mod number_sequence;
pub mod offer;
pub mod project;

pub use activity::ActivityRepository;
pub use budget_item::BudgetItemRepository;
pub use customer::{CreateCustomerInput, CustomerRepository};
pub use deal::{DealRepository, DealTransition, WonDeal};
pub use lifecycle::{AcceptOffer, AcceptedOffer, LifecycleService};
pub use number_sequence::NumberSequenceRepository;
pub use offer::{OfferRepository, OfferTransition};
pub use project::{ProjectRepository, ProjectTransition};
