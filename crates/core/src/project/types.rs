//! Project domain types.

use chrono::{DateTime, Utc};
use kontrakt_shared::types::{CustomerId, DealId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::numbering::CompanyId;

/// Lifecycle position of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    /// Quoting ("tilbud"); the initial phase.
    Tilbud,
    /// Work in progress.
    Working,
    /// Paused.
    OnHold,
    /// Delivered.
    Completed,
    /// Abandoned. Absolutely terminal.
    Cancelled,
}

impl ProjectPhase {
    /// Every phase.
    pub const ALL: [Self; 5] = [
        Self::Tilbud,
        Self::Working,
        Self::OnHold,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns the string representation of the phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tilbud => "tilbud",
            Self::Working => "working",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a phase from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tilbud" => Some(Self::Tilbud),
            "working" => Some(Self::Working),
            "on_hold" => Some(Self::OnHold),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Linked offers and budget items may only change in these phases.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Tilbud | Self::Working | Self::OnHold)
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lightweight container for offers. Carries no financials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Identifier.
    pub id: ProjectId,
    /// Name.
    pub name: String,
    /// Customer.
    pub customer_id: Option<CustomerId>,
    /// Company running the project.
    pub company_id: Option<CompanyId>,
    /// Human-readable number from the shared sequence.
    pub project_number: Option<String>,
    /// Lifecycle phase.
    pub phase: ProjectPhase,
    /// Deal the project came from.
    pub deal_id: Option<DealId>,
    /// Optimistic lock counter.
    pub version: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}
