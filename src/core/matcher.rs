use chrono::{DateTime, Utc};

use crate::core::{
    filters::filter_eligible,
    scoring::calculate_match_score,
};
use crate::models::{
    ContractorProfile, EligibilityCriteria, MatchResult, ProjectRequirement, ScoredCandidate,
    ScoringWeights,
};

/// Number of matches returned when the caller does not ask for a limit
pub const DEFAULT_MATCH_LIMIT: usize = 5;

/// Matching engine - filters, scores and ranks contractors for a project
///
/// # Pipeline Stages
/// 1. Eligibility filter (hard constraints)
/// 2. Per-candidate scoring
/// 3. Ranking and truncation
///
/// Holds nothing but the scoring weights, so it is cheap to clone into
/// scoring tasks.
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single contractor
    pub fn score_candidate(
        &self,
        project: &ProjectRequirement,
        contractor: ContractorProfile,
        now: DateTime<Utc>,
    ) -> ScoredCandidate {
        let (score, breakdown) = calculate_match_score(&contractor, project, &self.weights, now);

        ScoredCandidate {
            contractor,
            score,
            breakdown,
        }
    }

    /// Score every contractor, preserving input order
    pub fn score_all(
        &self,
        project: &ProjectRequirement,
        contractors: Vec<ContractorProfile>,
        now: DateTime<Utc>,
    ) -> Vec<ScoredCandidate> {
        contractors
            .into_iter()
            .map(|contractor| self.score_candidate(project, contractor, now))
            .collect()
    }

    /// Rank scored candidates by score (descending) and keep the best `limit`
    ///
    /// The sort is stable, so candidates with equal scores keep the order the
    /// directory returned them in.
    pub fn rank(&self, mut scored: Vec<ScoredCandidate>, limit: usize) -> MatchResult {
        let total_available = scored.len();
        if total_available == 0 {
            return MatchResult::no_contractors();
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        MatchResult {
            success: true,
            matches: scored,
            total_available,
            message: None,
        }
    }

    /// Find the best contractors for a project from an in-memory population
    ///
    /// # Arguments
    /// * `project` - The client's project requirements
    /// * `contractors` - Contractor population (need not be pre-filtered)
    /// * `limit` - Maximum number of matches to return
    /// * `now` - Reference time for the timeline factor
    pub fn find_matches(
        &self,
        project: &ProjectRequirement,
        contractors: Vec<ContractorProfile>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let criteria = EligibilityCriteria::from_requirement(project);
        let eligible = filter_eligible(contractors, &criteria);

        let scored = self.score_all(project, eligible, now);
        self.rank(scored, limit)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}
