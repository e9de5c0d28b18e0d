use crate::models::{MatchResult, ScoredCandidate};

/// Score at or above which a project is assigned without human review
pub const AUTO_ASSIGN_THRESHOLD: f64 = 80.0;

/// Runner-up contractors kept on a project for manual fallback
pub const MAX_ALTERNATES: usize = 3;

/// Decides which ranked candidates may be auto-assigned and which are kept
/// as alternates. Pure: persistence and notifications live in the service.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentPolicy {
    threshold: f64,
    max_alternates: usize,
}

impl AssignmentPolicy {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Candidates to try for auto-assignment, best first.
    ///
    /// Empty unless the top match clears the threshold. Later entries are
    /// the fallbacks used when an earlier contractor's capacity is taken by
    /// a concurrent assignment; they must clear the threshold too.
    pub fn assignment_order<'a>(&self, result: &'a MatchResult) -> Vec<&'a ScoredCandidate> {
        if !result.success {
            return Vec::new();
        }

        result
            .matches
            .iter()
            .take_while(|candidate| candidate.score >= self.threshold)
            .collect()
    }

    /// Alternate contractor ids to store on the project.
    ///
    /// Always drawn from ranks 2-4, never further down the list. `assigned`
    /// and the contractors in `excluded` (lost to a concurrent assignment)
    /// are removed from that window, so a fallback assignment leaves fewer
    /// alternates rather than pulling in rank 5.
    pub fn alternates(
        &self,
        result: &MatchResult,
        assigned: Option<&str>,
        excluded: &[String],
    ) -> Vec<String> {
        result
            .matches
            .iter()
            .skip(1)
            .take(self.max_alternates)
            .map(ScoredCandidate::contractor_id)
            .filter(|id| Some(*id) != assigned)
            .filter(|id| !excluded.iter().any(|e| e == id))
            .map(str::to_string)
            .collect()
    }
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self {
            threshold: AUTO_ASSIGN_THRESHOLD,
            max_alternates: MAX_ALTERNATES,
        }
    }
}
