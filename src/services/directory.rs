use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{ContractorProfile, EligibilityCriteria, ProjectRecord, ProjectStatus};

/// Errors raised by a contractor directory or project store
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Seed error: {0}")]
    SeedError(String),
}

/// Errors raised while committing an assignment
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The contractor's capacity was consumed between matching and commit
    #[error("Contractor {contractor_id} has no remaining capacity")]
    Conflict { contractor_id: String },

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Contractor not found: {0}")]
    ContractorNotFound(String),

    #[error("Project {project_id} is {status}, expected Requested")]
    InvalidTransition {
        project_id: String,
        status: ProjectStatus,
    },

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl From<sqlx::Error> for AssignmentError {
    fn from(value: sqlx::Error) -> Self {
        AssignmentError::Directory(DirectoryError::SqlxError(value))
    }
}

/// A commit request for one auto-assignment
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRequest {
    pub project_id: String,
    pub contractor_id: String,
    pub score: f64,
    pub alternates: Vec<String>,
    pub assigned_at: DateTime<Utc>,
}

/// Read side of the contractor directory
#[async_trait]
pub trait ContractorDirectory: Send + Sync {
    /// Contractors satisfying every hard filter, in a stable directory order
    async fn find_eligible(
        &self,
        criteria: &EligibilityCriteria,
    ) -> Result<Vec<ContractorProfile>, DirectoryError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Write side used by the assignment policy
///
/// `assign` must increment the contractor's `currentProjects` and link the
/// project in one atomic operation, conditioned on the contractor still
/// having capacity at commit time. When it does not, nothing is written and
/// `AssignmentError::Conflict` is returned.
#[async_trait]
pub trait AssignmentSink: Send + Sync {
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectRecord>, AssignmentError>;

    async fn assign(&self, request: &AssignmentRequest) -> Result<ProjectRecord, AssignmentError>;

    /// Store alternates on a project that stays unassigned
    ///
    /// Only writes while the project is still Requested; otherwise returns
    /// `AssignmentError::InvalidTransition` and leaves the record untouched.
    async fn record_alternates(
        &self,
        project_id: &str,
        alternates: &[String],
    ) -> Result<ProjectRecord, AssignmentError>;
}
