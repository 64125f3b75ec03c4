//! Collaborators shared by every repository.

use std::sync::Arc;

use kontrakt_core::access::{AccessPolicy, RoleAccessPolicy};
use kontrakt_core::error::LifecycleError;
use kontrakt_core::settings::LifecycleSettings;
use kontrakt_shared::config::NumberingConfig;
use kontrakt_shared::{AppConfig, Clock, IdGenerator, SystemClock, UuidV7Generator};
use sea_orm::DatabaseConnection;

/// Connection, injected collaborators and policy for lifecycle repositories.
///
/// Cheap to clone; every repository owns one.
#[derive(Debug, Clone)]
pub struct LifecycleContext {
    pub(crate) db: DatabaseConnection,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) access: Arc<dyn AccessPolicy>,
    pub(crate) settings: LifecycleSettings,
    pub(crate) numbering: NumberingConfig,
}

impl LifecycleContext {
    /// Creates a context with the system clock, v7 ids, the role policy and
    /// default settings.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidV7Generator),
            access: Arc::new(RoleAccessPolicy),
            settings: LifecycleSettings::default(),
            numbering: NumberingConfig::default(),
        }
    }

    /// Creates a context whose settings come from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the `lifecycle` section holds invalid values.
    pub fn from_config(db: DatabaseConnection, config: &AppConfig) -> Result<Self, LifecycleError> {
        let settings = LifecycleSettings::from_config(&config.lifecycle)?;
        Ok(Self::new(db)
            .with_settings(settings)
            .with_numbering(config.numbering.clone()))
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the id generator.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces the access policy.
    #[must_use]
    pub fn with_access(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    /// Replaces the lifecycle settings.
    #[must_use]
    pub fn with_settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the allocator retry policy.
    #[must_use]
    pub fn with_numbering(mut self, numbering: NumberingConfig) -> Self {
        self.numbering = numbering;
        self
    }

    /// The database connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The lifecycle settings.
    #[must_use]
    pub const fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn next_uuid(&self) -> uuid::Uuid {
        self.ids.next_uuid()
    }
}
