// Core algorithm exports
pub mod assignment;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use assignment::{AssignmentPolicy, AUTO_ASSIGN_THRESHOLD, MAX_ALTERNATES};
pub use distance::haversine_distance;
pub use filters::{filter_eligible, is_available, is_eligible};
pub use matcher::{Matcher, DEFAULT_MATCH_LIMIT};
pub use scoring::{calculate_match_score, NEUTRAL_SCORE};
