use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::ProjectRequirement;

/// Request to find matching contractors for a project description
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(nested)]
    pub project: ProjectRequirement,
    #[serde(default)]
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u16>,
}

/// Optional body for matching and assigning a stored project
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MatchProjectRequest {
    #[serde(default)]
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u16>,
}
