use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

use crate::core::filters::is_eligible;
use crate::models::{ContractorProfile, EligibilityCriteria, ProjectRecord, ProjectStatus};
use crate::services::directory::{
    AssignmentError, AssignmentRequest, AssignmentSink, ContractorDirectory, DirectoryError,
};

/// Seed file layout for the in-memory directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub contractors: Vec<ContractorProfile>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    contractors: Vec<ContractorProfile>,
    projects: HashMap<String, ProjectRecord>,
}

/// In-process contractor directory and project store
///
/// Every write happens under one lock, which gives `assign` the same
/// check-then-increment atomicity the PostgreSQL transaction provides.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let projects = seed
            .projects
            .into_iter()
            .map(|project| (project.id.clone(), project))
            .collect();

        Self {
            state: Mutex::new(DirectoryState {
                contractors: seed.contractors,
                projects,
            }),
        }
    }

    /// Load contractors and projects from a JSON seed file
    pub fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::SeedError(format!("{}: {}", path.display(), e)))?;
        let seed: DirectorySeed = serde_json::from_str(&raw)
            .map_err(|e| DirectoryError::SeedError(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            "Loaded directory seed with {} contractors and {} projects",
            seed.contractors.len(),
            seed.projects.len()
        );

        Ok(Self::from_seed(seed))
    }

    /// Add or replace a contractor, keeping its original position on replace
    pub async fn upsert_contractor(&self, contractor: ContractorProfile) {
        let mut state = self.state.lock().await;
        match state.contractors.iter_mut().find(|c| c.id == contractor.id) {
            Some(existing) => *existing = contractor,
            None => state.contractors.push(contractor),
        }
    }

    pub async fn upsert_project(&self, project: ProjectRecord) {
        let mut state = self.state.lock().await;
        state.projects.insert(project.id.clone(), project);
    }

    pub async fn contractor(&self, contractor_id: &str) -> Option<ContractorProfile> {
        let state = self.state.lock().await;
        state.contractors.iter().find(|c| c.id == contractor_id).cloned()
    }

    pub async fn project(&self, project_id: &str) -> Option<ProjectRecord> {
        let state = self.state.lock().await;
        state.projects.get(project_id).cloned()
    }
}

/// Take one slot of a contractor's capacity; false when none is left
fn increment_load(contractor: &mut ContractorProfile) -> bool {
    if !contractor.availability.has_capacity() {
        return false;
    }
    contractor.availability.current_projects += 1;
    true
}

#[async_trait]
impl ContractorDirectory for InMemoryDirectory {
    async fn find_eligible(
        &self,
        criteria: &EligibilityCriteria,
    ) -> Result<Vec<ContractorProfile>, DirectoryError> {
        let state = self.state.lock().await;
        Ok(state
            .contractors
            .iter()
            .filter(|profile| is_eligible(profile, criteria))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssignmentSink for InMemoryDirectory {
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectRecord>, AssignmentError> {
        Ok(self.project(project_id).await)
    }

    async fn assign(&self, request: &AssignmentRequest) -> Result<ProjectRecord, AssignmentError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let project = state
            .projects
            .get_mut(&request.project_id)
            .ok_or_else(|| AssignmentError::ProjectNotFound(request.project_id.clone()))?;
        if project.status != ProjectStatus::Requested {
            return Err(AssignmentError::InvalidTransition {
                project_id: project.id.clone(),
                status: project.status,
            });
        }

        let contractor = state
            .contractors
            .iter_mut()
            .find(|c| c.id == request.contractor_id)
            .ok_or_else(|| AssignmentError::ContractorNotFound(request.contractor_id.clone()))?;
        if !increment_load(contractor) {
            return Err(AssignmentError::Conflict {
                contractor_id: request.contractor_id.clone(),
            });
        }
        contractor.project_history.push(request.project_id.clone());

        project.contractor_id = Some(request.contractor_id.clone());
        project.status = ProjectStatus::Assigned;
        project.actual_start_date = Some(request.assigned_at);
        project.algorithm_score = Some(request.score);
        project.alternate_contractors = request.alternates.clone();

        Ok(project.clone())
    }

    async fn record_alternates(
        &self,
        project_id: &str,
        alternates: &[String],
    ) -> Result<ProjectRecord, AssignmentError> {
        let mut state = self.state.lock().await;
        let project = state
            .projects
            .get_mut(project_id)
            .ok_or_else(|| AssignmentError::ProjectNotFound(project_id.to_string()))?;
        if project.status != ProjectStatus::Requested {
            return Err(AssignmentError::InvalidTransition {
                project_id: project.id.clone(),
                status: project.status,
            });
        }

        project.alternate_contractors = alternates.to_vec();
        Ok(project.clone())
    }
}
