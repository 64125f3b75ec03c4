//! Project phase state machine.

use chrono::{DateTime, Utc};
use kontrakt_shared::types::{CustomerId, DealId, ProjectId};

use crate::error::LifecycleError;
use crate::numbering::CompanyId;
use crate::project::types::{Project, ProjectPhase};

/// Allowed non-identity moves per phase. `cancelled` has no exits.
pub const PROJECT_TRANSITIONS: [(ProjectPhase, &[ProjectPhase]); 5] = [
    (
        ProjectPhase::Tilbud,
        &[
            ProjectPhase::Working,
            ProjectPhase::OnHold,
            ProjectPhase::Cancelled,
        ],
    ),
    (
        ProjectPhase::Working,
        &[
            ProjectPhase::OnHold,
            ProjectPhase::Completed,
            ProjectPhase::Cancelled,
            ProjectPhase::Tilbud,
        ],
    ),
    (
        ProjectPhase::OnHold,
        &[
            ProjectPhase::Working,
            ProjectPhase::Cancelled,
            ProjectPhase::Completed,
        ],
    ),
    (ProjectPhase::Completed, &[ProjectPhase::Working]),
    (ProjectPhase::Cancelled, &[]),
];

/// Input for creating a project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    /// Name.
    pub name: String,
    /// Customer; must exist when given.
    pub customer_id: Option<CustomerId>,
    /// Company; a number is allocated when present.
    pub company_id: Option<CompanyId>,
    /// Originating deal.
    pub deal_id: Option<DealId>,
}

/// Stateless project phase machine.
pub struct ProjectPhaseMachine;

impl ProjectPhaseMachine {
    /// Initial phase of every new project.
    pub const INITIAL_PHASE: ProjectPhase = ProjectPhase::Tilbud;

    /// Returns true if `from → to` is allowed. Identity is always allowed.
    #[must_use]
    pub fn can_transition(from: ProjectPhase, to: ProjectPhase) -> bool {
        from == to
            || PROJECT_TRANSITIONS
                .iter()
                .find(|(phase, _)| *phase == from)
                .is_some_and(|(_, targets)| targets.contains(&to))
    }

    /// Builds a new project in the initial phase.
    pub fn create(
        id: ProjectId,
        input: NewProject,
        project_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Project, LifecycleError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LifecycleError::InvalidArgument(
                "project name must not be empty".to_string(),
            ));
        }
        Ok(Project {
            id,
            name: name.to_string(),
            customer_id: input.customer_id,
            company_id: input.company_id,
            project_number,
            phase: Self::INITIAL_PHASE,
            deal_id: input.deal_id,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the project to `target`. `Ok(None)` for the identity transition.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the move is not in [`PROJECT_TRANSITIONS`].
    pub fn transition(project: &Project, target: ProjectPhase) -> Result<Option<Project>, LifecycleError> {
        if project.phase == target {
            return Ok(None);
        }
        if !Self::can_transition(project.phase, target) {
            return Err(LifecycleError::transition("project", project.phase, target));
        }
        let mut next = project.clone();
        next.phase = target;
        Ok(Some(next))
    }

    /// Rejects changes to offers or budget items of a project that is not editable.
    ///
    /// # Errors
    ///
    /// `InvalidState` for completed or cancelled projects.
    pub fn ensure_editable(project: &Project) -> Result<(), LifecycleError> {
        if project.phase.is_editable() {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState(format!(
                "project {} is {} and cannot be edited",
                project.id, project.phase
            )))
        }
    }
}
