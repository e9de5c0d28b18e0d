//! Contractor Match - matching and auto-assignment service for home-renovation projects
//!
//! Filters the contractor directory down to eligible professionals, scores
//! each on seven weighted factors, ranks them and, when the best score is
//! high enough, assigns the project while keeping runners-up as alternates.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{haversine_distance, AssignmentPolicy, Matcher};
pub use models::{
    ContractorProfile, FindMatchesRequest, MatchResult, ProjectRecord, ProjectRequirement,
    ScoredCandidate, ScoringWeights,
};
pub use services::{AssignmentOutcome, MatchingError, MatchingService};
