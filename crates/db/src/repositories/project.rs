//! Project repository for phase transitions.

use chrono::{DateTime, Datelike, Utc};
use kontrakt_core::access::Actor;
use kontrakt_core::activity::{Activity, ActivityTarget, NewActivity};
use kontrakt_core::budget::BudgetParentType;
use kontrakt_core::error::LifecycleError;
use kontrakt_core::project::{NewProject, Project, ProjectPhase, ProjectPhaseMachine};
use kontrakt_shared::types::ProjectId;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait, Value};
use tracing::{info, warn};

use super::activity::insert_activity;
use super::customer::ensure_customer;
use super::number_sequence::allocate_number;
use crate::context::LifecycleContext;
use crate::entities::sea_orm_active_enums;
use crate::entities::{budget_items, offers, projects};
use crate::mapping::{db_error, project_from_model, project_to_active};

/// A project after a phase operation.
#[derive(Debug, Clone)]
pub struct ProjectTransition {
    /// The project as persisted.
    pub project: Project,
    /// The activity row for the change; `None` for the identity transition.
    pub activity: Option<Activity>,
}

/// Project repository for database operations.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    ctx: LifecycleContext,
}

impl ProjectRepository {
    /// Creates a new project repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Creates a project in `tilbud`, numbered when its company is known.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a given customer does not exist
    /// - `InvalidArgument` for an empty name
    /// - `RetryExhausted` if the number could not be allocated
    pub async fn create_project(
        &self,
        input: NewProject,
        actor: &Actor,
    ) -> Result<Project, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;
        let project = create_project_in(&txn, &self.ctx, input, actor).await?;
        txn.commit().await.map_err(db_error)?;
        Ok(project)
    }

    /// Finds a project by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub async fn find(&self, id: ProjectId) -> Result<Project, LifecycleError> {
        load_project(&self.ctx.db, id).await
    }

    /// Moves a project to `target`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` for moves outside the transition table
    /// - `ConcurrentModification` if the project changed underneath
    #[tracing::instrument(skip_all, fields(project_id = %id, target = %target))]
    pub async fn transition_phase(
        &self,
        id: ProjectId,
        target: ProjectPhase,
        actor: &Actor,
    ) -> Result<ProjectTransition, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let project = load_project(&txn, id).await?;
        let from = project.phase;
        let Some(next) = ProjectPhaseMachine::transition(&project, target)? else {
            return Ok(ProjectTransition {
                project,
                activity: None,
            });
        };

        let saved = save_project(&txn, next, project.version, self.ctx.clock.now()).await?;
        let activity = insert_activity(
            &txn,
            &self.ctx,
            NewActivity::transition(ActivityTarget::Project(id), from, target),
            actor,
        )
        .await?;

        txn.commit().await.map_err(db_error)?;

        info!(project_id = %id, from = %from, to = %target, user_id = %actor.user_id, "Project phase changed");
        Ok(ProjectTransition {
            project: saved,
            activity: Some(activity),
        })
    }

    /// Deletes a project together with its budget items.
    ///
    /// Offers linked to the project are kept and lose the link.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub async fn delete(&self, id: ProjectId, actor: &Actor) -> Result<(), LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        load_project(&txn, id).await?;

        let parent_type: sea_orm_active_enums::BudgetParentType = BudgetParentType::Project.into();
        budget_items::Entity::delete_many()
            .filter(budget_items::Column::ParentType.eq(parent_type))
            .filter(budget_items::Column::ParentId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        offers::Entity::update_many()
            .col_expr(offers::Column::ProjectId, Expr::value(Value::Uuid(None)))
            .filter(offers::Column::ProjectId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        projects::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(db_error)?;

        insert_activity(
            &txn,
            &self.ctx,
            NewActivity::new(ActivityTarget::Project(id), "Project deleted"),
            actor,
        )
        .await?;

        txn.commit().await.map_err(db_error)?;

        info!(project_id = %id, user_id = %actor.user_id, "Project deleted");
        Ok(())
    }
}

/// Validates references, allocates a number and inserts a new project.
pub(crate) async fn create_project_in<C>(
    conn: &C,
    ctx: &LifecycleContext,
    input: NewProject,
    actor: &Actor,
) -> Result<Project, LifecycleError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(customer_id) = input.customer_id {
        ensure_customer(conn, customer_id).await?;
    }

    let now = ctx.clock.now();
    let project_number = match input.company_id.as_ref() {
        Some(company) => Some(
            allocate_number(conn, &ctx.numbering, company, ctx.clock.today().year(), now)
                .await?
                .to_string(),
        ),
        None => None,
    };

    let project = ProjectPhaseMachine::create(ProjectId(ctx.next_uuid()), input, project_number, now)?;
    projects::Entity::insert(project_to_active(&project))
        .exec_without_returning(conn)
        .await
        .map_err(db_error)?;

    insert_activity(
        conn,
        ctx,
        NewActivity::new(ActivityTarget::Project(project.id), "Project created"),
        actor,
    )
    .await?;

    info!(
        project_id = %project.id,
        project_number = ?project.project_number,
        deal_id = ?project.deal_id,
        "Project created"
    );
    Ok(project)
}

/// Loads a project, failing with `NotFound` when it does not exist.
pub(crate) async fn load_project<C: ConnectionTrait>(
    conn: &C,
    id: ProjectId,
) -> Result<Project, LifecycleError> {
    projects::Entity::find_by_id(id.0)
        .one(conn)
        .await
        .map_err(db_error)?
        .map(project_from_model)
        .ok_or_else(|| LifecycleError::not_found("project", id))
}

async fn save_project<C: ConnectionTrait>(
    conn: &C,
    mut next: Project,
    expected_version: i32,
    now: DateTime<Utc>,
) -> Result<Project, LifecycleError> {
    next.version = expected_version + 1;
    next.updated_at = now;

    let result = projects::Entity::update_many()
        .set(project_to_active(&next))
        .filter(projects::Column::Id.eq(next.id.0))
        .filter(projects::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        warn!(project_id = %next.id, expected_version, "Project was modified concurrently");
        return Err(LifecycleError::conflict("project", next.id));
    }
    Ok(next)
}
