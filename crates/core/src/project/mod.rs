//! Projects: delivery containers with their own phase lifecycle.

pub mod machine;
pub mod types;

pub use machine::{NewProject, PROJECT_TRANSITIONS, ProjectPhaseMachine};
pub use types::{Project, ProjectPhase};
