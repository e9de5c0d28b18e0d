// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Availability, Budget, ContractorProfile, ContractorStatus, Coordinates, EligibilityCriteria,
    Expertise, MatchResult, MatchingPreferences, Pricing, ProjectLocation, ProjectRecord,
    ProjectRequirement, ProjectStatus, ProjectTimeline, Ratings, ScoreBreakdown, ScoredCandidate,
    ScoringWeights, ServiceAreas, UrgencyLevel, Verification,
};
pub use requests::{FindMatchesRequest, MatchProjectRequest};
pub use responses::{ErrorResponse, HealthResponse};
