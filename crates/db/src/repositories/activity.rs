//! Activity log repository.
//!
//! Rows are appended inside the transaction of the change they describe and
//! never updated.

use kontrakt_core::access::Actor;
use kontrakt_core::activity::{Activity, ActivityTarget, NewActivity};
use kontrakt_core::error::LifecycleError;
use kontrakt_shared::types::ActivityId;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::context::LifecycleContext;
use crate::entities::activities;
use crate::entities::sea_orm_active_enums::ActivityTargetType;
use crate::mapping::{activity_from_model, activity_to_active, db_error};

/// Read access to the activity log.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    ctx: LifecycleContext,
}

impl ActivityRepository {
    /// Creates a new activity repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Lists the activities of one entity, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `Database` on store failure.
    pub async fn list_for(&self, target: ActivityTarget) -> Result<Vec<Activity>, LifecycleError> {
        let target_type: ActivityTargetType = target.kind().into();
        let rows = activities::Entity::find()
            .filter(activities::Column::TargetType.eq(target_type))
            .filter(activities::Column::TargetId.eq(target.id()))
            .order_by_desc(activities::Column::OccurredAt)
            .order_by_desc(activities::Column::Id)
            .all(&self.ctx.db)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(activity_from_model).collect())
    }
}

/// Appends an activity attributed to `actor` at the context clock's time.
pub(crate) async fn insert_activity<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    activity: NewActivity,
    actor: &Actor,
) -> Result<Activity, LifecycleError> {
    let activity = activity.into_activity(ActivityId(ctx.next_uuid()), actor, ctx.clock.now());
    activities::Entity::insert(activity_to_active(&activity))
        .exec_without_returning(conn)
        .await
        .map_err(db_error)?;
    Ok(activity)
}
