use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::core::{filter_eligible, AssignmentPolicy, Matcher, DEFAULT_MATCH_LIMIT};
use crate::models::{
    ContractorProfile, EligibilityCriteria, MatchResult, ProjectRecord, ProjectRequirement,
    ProjectStatus, ScoredCandidate,
};
use crate::services::directory::{
    AssignmentError, AssignmentRequest, AssignmentSink, ContractorDirectory,
};
use crate::services::notifications::{NotificationError, NotificationSink};

/// Failures of a matching or assignment run
///
/// An empty eligible set is not an error; it is reported through
/// `MatchResult::success`.
#[derive(Debug, Error)]
pub enum MatchingError {
    /// The directory could not be queried (I/O, database or timeout). Retryable.
    #[error("Matching unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Project {project_id} is {status}, expected Requested")]
    InvalidTransition {
        project_id: String,
        status: ProjectStatus,
    },

    #[error("Scoring task failed: {0}")]
    Scoring(String),
}

impl From<AssignmentError> for MatchingError {
    fn from(value: AssignmentError) -> Self {
        match value {
            AssignmentError::ProjectNotFound(id) => MatchingError::ProjectNotFound(id),
            AssignmentError::InvalidTransition { project_id, status } => {
                MatchingError::InvalidTransition { project_id, status }
            }
            other => MatchingError::DirectoryUnavailable(other.to_string()),
        }
    }
}

/// Runtime knobs for the matching service
#[derive(Debug, Clone)]
pub struct MatchingOptions {
    pub default_limit: usize,
    pub max_limit: usize,
    pub directory_timeout: Duration,
    pub notification_timeout: Duration,
    /// Candidates per scoring task; smaller snapshots are scored inline
    pub scoring_chunk_size: usize,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_MATCH_LIMIT,
            max_limit: 50,
            directory_timeout: Duration::from_secs(5),
            notification_timeout: Duration::from_secs(5),
            scoring_chunk_size: 64,
        }
    }
}

/// Result of applying the assignment policy to one project
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub project: ProjectRecord,
    #[serde(rename = "assignedContractorId")]
    pub assigned_contractor_id: Option<String>,
    pub score: Option<f64>,
    pub alternates: Vec<String>,
    /// Contractors skipped because their capacity was taken concurrently
    pub conflicts: Vec<String>,
    /// Non-fatal problems, e.g. failed notifications
    pub warnings: Vec<String>,
    #[serde(rename = "matchResult")]
    pub match_result: MatchResult,
}

impl AssignmentOutcome {
    pub fn is_assigned(&self) -> bool {
        self.assigned_contractor_id.is_some()
    }
}

/// Matching entry point used by the HTTP layer and other subsystems
///
/// `find_best_matches` is read-only. Assignment is the separate, explicit
/// `assign_best_match` / `apply_assignment` step.
#[derive(Clone)]
pub struct MatchingService {
    matcher: Matcher,
    policy: AssignmentPolicy,
    directory: Arc<dyn ContractorDirectory>,
    assignments: Arc<dyn AssignmentSink>,
    notifier: Arc<dyn NotificationSink>,
    options: MatchingOptions,
}

impl MatchingService {
    pub fn new(
        matcher: Matcher,
        directory: Arc<dyn ContractorDirectory>,
        assignments: Arc<dyn AssignmentSink>,
        notifier: Arc<dyn NotificationSink>,
        options: MatchingOptions,
    ) -> Self {
        Self {
            matcher,
            policy: AssignmentPolicy::default(),
            directory,
            assignments,
            notifier,
            options,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub async fn directory_healthy(&self) -> bool {
        self.directory.health_check().await
    }

    fn resolve_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.options.default_limit)
            .clamp(1, self.options.max_limit.max(1))
    }

    /// Run a directory call under the configured timeout
    async fn with_directory_timeout<T, E, F>(&self, operation: &str, call: F) -> Result<T, MatchingError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<MatchingError>,
    {
        match tokio::time::timeout(self.options.directory_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                tracing::error!(
                    "Directory {} timed out after {:?}",
                    operation,
                    self.options.directory_timeout
                );
                Err(MatchingError::DirectoryUnavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.options.directory_timeout
                )))
            }
        }
    }

    /// Find the best contractors for a project
    ///
    /// Fetches one directory snapshot, re-applies the eligibility filter,
    /// scores candidates concurrently and ranks them.
    pub async fn find_best_matches(
        &self,
        project: &ProjectRequirement,
        limit: Option<usize>,
    ) -> Result<MatchResult, MatchingError> {
        let limit = self.resolve_limit(limit);
        let criteria = EligibilityCriteria::from_requirement(project);

        let snapshot = self
            .with_directory_timeout("query", async {
                self.directory.find_eligible(&criteria).await.map_err(|e| {
                    tracing::error!("Failed to query contractor directory: {}", e);
                    MatchingError::DirectoryUnavailable(e.to_string())
                })
            })
            .await?;

        let eligible = filter_eligible(snapshot, &criteria);
        if eligible.is_empty() {
            tracing::info!("No eligible contractors for criteria {:?}", criteria);
            return Ok(MatchResult::no_contractors());
        }

        let scored = self.score_concurrently(project, eligible, Utc::now()).await?;
        let result = self.matcher.rank(scored, limit);

        tracing::info!(
            "Returning {} matches (from {} eligible contractors), top score {:?}",
            result.matches.len(),
            result.total_available,
            result.top().map(|m| m.score)
        );

        Ok(result)
    }

    /// Score a snapshot on the blocking pool in chunks, keeping snapshot order
    async fn score_concurrently(
        &self,
        project: &ProjectRequirement,
        contractors: Vec<ContractorProfile>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, MatchingError> {
        let chunk_size = self.options.scoring_chunk_size.max(1);
        if contractors.len() <= chunk_size {
            return Ok(self.matcher.score_all(project, contractors, now));
        }

        let total = contractors.len();
        let project = Arc::new(project.clone());
        let mut tasks = JoinSet::new();

        let mut remaining = contractors;
        let mut index = 0usize;
        while !remaining.is_empty() {
            let rest = remaining.split_off(chunk_size.min(remaining.len()));
            let chunk = std::mem::replace(&mut remaining, rest);

            let matcher = self.matcher.clone();
            let project = Arc::clone(&project);
            tasks.spawn_blocking(move || (index, matcher.score_all(&project, chunk, now)));
            index += 1;
        }

        let mut chunks = Vec::with_capacity(index);
        while let Some(joined) = tasks.join_next().await {
            let chunk = joined.map_err(|e| MatchingError::Scoring(e.to_string()))?;
            chunks.push(chunk);
        }
        chunks.sort_by_key(|(index, _)| *index);

        tracing::debug!("Scored {} contractors in {} tasks", total, chunks.len());

        Ok(chunks.into_iter().flat_map(|(_, scored)| scored).collect())
    }

    /// Match a stored project and apply the assignment policy to it
    pub async fn assign_best_match(
        &self,
        project_id: &str,
        limit: Option<usize>,
    ) -> Result<AssignmentOutcome, MatchingError> {
        let project = self
            .with_directory_timeout("project lookup", self.assignments.fetch_project(project_id))
            .await?
            .ok_or_else(|| MatchingError::ProjectNotFound(project_id.to_string()))?;

        if project.status != ProjectStatus::Requested {
            return Err(MatchingError::InvalidTransition {
                project_id: project.id,
                status: project.status,
            });
        }

        let result = self.find_best_matches(&project.requirement, limit).await?;
        self.apply_assignment(&project, result).await
    }

    /// Apply the assignment policy to an already computed ranking
    ///
    /// Tries the ranked candidates that clear the threshold in order. A
    /// capacity conflict moves on to the next one; once they are exhausted
    /// the project stays Requested with alternates recorded. If another run
    /// moved the project past Requested in the meantime, nothing is written
    /// and `MatchingError::InvalidTransition` is returned.
    pub async fn apply_assignment(
        &self,
        project: &ProjectRecord,
        result: MatchResult,
    ) -> Result<AssignmentOutcome, MatchingError> {
        let mut conflicts: Vec<String> = Vec::new();
        let order: Vec<(String, f64)> = self
            .policy
            .assignment_order(&result)
            .into_iter()
            .map(|candidate| (candidate.contractor_id().to_string(), candidate.score))
            .collect();

        for (contractor_id, score) in order {
            let alternates = self.policy.alternates(&result, Some(contractor_id.as_str()), &conflicts);
            let request = AssignmentRequest {
                project_id: project.id.clone(),
                contractor_id: contractor_id.clone(),
                score,
                alternates: alternates.clone(),
                assigned_at: Utc::now(),
            };

            let committed = tokio::time::timeout(
                self.options.directory_timeout,
                self.assignments.assign(&request),
            )
            .await;

            match committed {
                Ok(Ok(updated)) => {
                    tracing::info!(
                        "Auto-assigned project {} to contractor {} (score {})",
                        project.id,
                        contractor_id,
                        score
                    );

                    let warnings = self.notify_assignment(&updated, &contractor_id).await;

                    return Ok(AssignmentOutcome {
                        project: updated,
                        assigned_contractor_id: Some(contractor_id),
                        score: Some(score),
                        alternates,
                        conflicts,
                        warnings,
                        match_result: result,
                    });
                }
                Ok(Err(AssignmentError::Conflict { .. }))
                | Ok(Err(AssignmentError::ContractorNotFound(_))) => {
                    tracing::warn!(
                        "Contractor {} unavailable at commit for project {}, trying next candidate",
                        contractor_id,
                        project.id
                    );
                    conflicts.push(contractor_id);
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(MatchingError::DirectoryUnavailable(format!(
                        "assignment timed out after {:?}",
                        self.options.directory_timeout
                    )))
                }
            }
        }

        let alternates = self.policy.alternates(&result, None, &conflicts);
        let project = if result.success {
            self.with_directory_timeout(
                "alternates update",
                self.assignments.record_alternates(&project.id, &alternates),
            )
            .await?
        } else {
            project.clone()
        };

        tracing::info!(
            "Project {} left unassigned (top score {:?}, {} alternates)",
            project.id,
            result.top().map(|m| m.score),
            alternates.len()
        );

        Ok(AssignmentOutcome {
            project,
            assigned_contractor_id: None,
            score: None,
            alternates,
            conflicts,
            warnings: Vec::new(),
            match_result: result,
        })
    }

    /// Notify contractor and client; failures come back as warnings
    async fn notify_assignment(&self, project: &ProjectRecord, contractor_id: &str) -> Vec<String> {
        let timeout = self.options.notification_timeout;

        let (contractor, client) = tokio::join!(
            tokio::time::timeout(
                timeout,
                self.notifier.notify_contractor_assigned(contractor_id, &project.id)
            ),
            tokio::time::timeout(
                timeout,
                self.notifier.notify_client_assigned(&project.client_id, contractor_id)
            ),
        );

        [("contractor", contractor), ("client", client)]
            .into_iter()
            .filter_map(|(recipient, sent)| {
                let err = match sent {
                    Ok(Ok(())) => return None,
                    Ok(Err(e)) => e,
                    Err(_) => NotificationError::Timeout(timeout),
                };
                tracing::warn!(
                    "Assignment of project {} kept, but {} notification failed: {}",
                    project.id,
                    recipient,
                    err
                );
                Some(format!("{} notification failed: {}", recipient, err))
            })
            .collect()
    }
}
