//! Append-only activity log entries.
//!
//! An activity points at exactly one entity. The target is a sum type so a
//! row can never reference two owners or none.

use chrono::{DateTime, Utc};
use kontrakt_shared::types::{ActivityId, CustomerId, DealId, OfferId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::access::Actor;
use crate::error::LifecycleError;

/// Discriminant of an [`ActivityTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTargetKind {
    /// A customer.
    Customer,
    /// A deal.
    Deal,
    /// An offer.
    Offer,
    /// A project.
    Project,
}

impl ActivityTargetKind {
    /// Returns the stored discriminant.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Deal => "deal",
            Self::Offer => "offer",
            Self::Project => "project",
        }
    }

    /// Parses a stored discriminant.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "deal" => Some(Self::Deal),
            "offer" => Some(Self::Offer),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityTargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single entity an activity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActivityTarget {
    /// A customer.
    Customer(CustomerId),
    /// A deal.
    Deal(DealId),
    /// An offer.
    Offer(OfferId),
    /// A project.
    Project(ProjectId),
}

impl ActivityTarget {
    /// Rebuilds a target from its stored `(kind, id)` pair.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown discriminant.
    pub fn from_parts(kind: &str, id: Uuid) -> Result<Self, LifecycleError> {
        match ActivityTargetKind::parse(kind) {
            Some(ActivityTargetKind::Customer) => Ok(Self::Customer(CustomerId(id))),
            Some(ActivityTargetKind::Deal) => Ok(Self::Deal(DealId(id))),
            Some(ActivityTargetKind::Offer) => Ok(Self::Offer(OfferId(id))),
            Some(ActivityTargetKind::Project) => Ok(Self::Project(ProjectId(id))),
            None => Err(LifecycleError::InvalidArgument(format!(
                "unknown activity target type '{kind}'"
            ))),
        }
    }

    /// Discriminant of this target.
    #[must_use]
    pub const fn kind(&self) -> ActivityTargetKind {
        match self {
            Self::Customer(_) => ActivityTargetKind::Customer,
            Self::Deal(_) => ActivityTargetKind::Deal,
            Self::Offer(_) => ActivityTargetKind::Offer,
            Self::Project(_) => ActivityTargetKind::Project,
        }
    }

    /// Raw id of the target entity.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Customer(id) => id.0,
            Self::Deal(id) => id.0,
            Self::Offer(id) => id.0,
            Self::Project(id) => id.0,
        }
    }
}

/// A persisted activity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Identifier.
    pub id: ActivityId,
    /// Entity the activity is about.
    pub target: ActivityTarget,
    /// One-line summary.
    pub title: String,
    /// Optional detail.
    pub body: Option<String>,
    /// Who caused it.
    pub actor_id: String,
    /// Display name of the actor at the time.
    pub actor_name: String,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// An activity about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    /// Entity the activity is about.
    pub target: ActivityTarget,
    /// One-line summary.
    pub title: String,
    /// Optional detail.
    pub body: Option<String>,
}

impl NewActivity {
    /// Creates an activity with just a title.
    pub fn new(target: ActivityTarget, title: impl Into<String>) -> Self {
        Self {
            target,
            title: title.into(),
            body: None,
        }
    }

    /// Attaches a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Entry for a stage or phase change.
    pub fn transition(
        target: ActivityTarget,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::new(
            target,
            format!("{} moved from {from} to {to}", target.kind()),
        )
    }

    /// Materializes the row.
    #[must_use]
    pub fn into_activity(self, id: ActivityId, actor: &Actor, occurred_at: DateTime<Utc>) -> Activity {
        Activity {
            id,
            target: self.target,
            title: self.title,
            body: self.body,
            actor_id: actor.user_id.clone(),
            actor_name: actor.display_name.clone(),
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("customer", ActivityTargetKind::Customer)]
    #[case("deal", ActivityTargetKind::Deal)]
    #[case("offer", ActivityTargetKind::Offer)]
    #[case("project", ActivityTargetKind::Project)]
    fn test_target_from_parts(#[case] kind: &str, #[case] expected: ActivityTargetKind) {
        let id = Uuid::from_u128(7);
        let target = ActivityTarget::from_parts(kind, id).unwrap();
        assert_eq!(target.kind(), expected);
        assert_eq!(target.id(), id);
        assert_eq!(target.kind().as_str(), kind);
    }

    #[test]
    fn test_unknown_target_kind() {
        let err = ActivityTarget::from_parts("invoice", Uuid::nil()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_transition_title() {
        let target = ActivityTarget::Offer(OfferId(Uuid::nil()));
        let entry = NewActivity::transition(target, "draft", "in_progress");
        assert_eq!(entry.title, "offer moved from draft to in_progress");
        assert_eq!(entry.body, None);
    }

    #[test]
    fn test_into_activity_records_actor() {
        let actor = Actor::new("u-1", "Ola Nordmann");
        let at = Utc::now();
        let activity = NewActivity::new(ActivityTarget::Deal(DealId(Uuid::nil())), "Deal won")
            .with_body("signed")
            .into_activity(ActivityId(Uuid::from_u128(1)), &actor, at);
        assert_eq!(activity.actor_id, "u-1");
        assert_eq!(activity.actor_name, "Ola Nordmann");
        assert_eq!(activity.body.as_deref(), Some("signed"));
        assert_eq!(activity.occurred_at, at);
    }
}
