use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether the pair describes a real position.
    ///
    /// Upstream records store an unset location as `0,0`, so that pair is
    /// treated the same as a missing one.
    pub fn is_known(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

/// Client-declared urgency of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    /// Any value the directory does not recognise; scores neutrally
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Budget {
    #[validate(range(min = 0.0))]
    pub total: Option<f64>,
}

impl Budget {
    /// Total budget when one was actually provided (zero counts as unset)
    pub fn amount(&self) -> Option<f64> {
        self.total.filter(|total| total.is_finite() && *total > 0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProjectLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectTimeline {
    #[serde(rename = "preferredStartDate", default)]
    pub preferred_start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingPreferences {
    #[serde(rename = "urgencyLevel", default)]
    pub urgency_level: Option<UrgencyLevel>,
}

/// What a client asked for. Input to a single matching run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProjectRequirement {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(rename = "propertyType", default)]
    pub property_type: Option<String>,
    #[serde(rename = "specialRequirements", default)]
    pub special_requirements: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub budget: Budget,
    #[serde(default)]
    #[validate(nested)]
    pub location: ProjectLocation,
    #[serde(default)]
    pub timeline: ProjectTimeline,
    #[serde(default)]
    pub matching: MatchingPreferences,
}

impl ProjectRequirement {
    pub fn city(&self) -> Option<&str> {
        self.location.city.as_deref().filter(|city| !city.is_empty())
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.coordinates.filter(Coordinates::is_known)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractorStatus {
    Active,
    Inactive,
    Suspended,
}

impl ContractorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractorStatus::Active => "Active",
            ContractorStatus::Inactive => "Inactive",
            ContractorStatus::Suspended => "Suspended",
        }
    }
}

impl FromStr for ContractorStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Active" => Ok(ContractorStatus::Active),
            "Inactive" => Ok(ContractorStatus::Inactive),
            "Suspended" => Ok(ContractorStatus::Suspended),
            other => Err(format!("unknown contractor status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verification {
    #[serde(rename = "profileVerified", default)]
    pub profile_verified: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expertise {
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
    pub configurations: Vec<String>,
    pub property_types: Vec<String>,
    pub specializations: Vec<String>,
}

/// Travel radius used when a contractor never set one
pub const DEFAULT_MAX_TRAVEL_KM: f64 = 50.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAreas {
    pub primary: Option<String>,
    pub secondary: Vec<String>,
    pub max_travel_distance: Option<f64>,
    pub primary_coordinates: Option<Coordinates>,
}

impl ServiceAreas {
    pub fn max_travel_km(&self) -> f64 {
        self.max_travel_distance
            .filter(|km| km.is_finite() && *km > 0.0)
            .unwrap_or(DEFAULT_MAX_TRAVEL_KM)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.primary_coordinates.filter(Coordinates::is_known)
    }

    pub fn covers_city(&self, city: &str) -> bool {
        self.primary.as_deref() == Some(city) || self.secondary.iter().any(|c| c == city)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(rename = "minimumProject", default)]
    pub minimum_project: Option<f64>,
}

impl Pricing {
    /// Minimum project value, with an unset minimum counting as zero
    pub fn minimum(&self) -> f64 {
        self.minimum_project.filter(|m| m.is_finite() && *m > 0.0).unwrap_or(0.0)
    }
}

fn default_max_concurrent() -> u32 { 3 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    #[serde(rename = "currentProjects", default)]
    pub current_projects: u32,
    #[serde(rename = "maxConcurrentProjects", default = "default_max_concurrent")]
    pub max_concurrent_projects: u32,
}

impl Availability {
    pub fn has_capacity(&self) -> bool {
        self.current_projects < self.max_concurrent_projects
    }
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            current_projects: 0,
            max_concurrent_projects: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(default)]
    pub overall: f64,
    #[serde(rename = "totalReviews", default)]
    pub total_reviews: u32,
}

/// Contractor profile as held by the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractorProfile {
    pub id: String,
    #[serde(rename = "businessName", default)]
    pub business_name: Option<String>,
    pub status: ContractorStatus,
    #[serde(default)]
    pub verification: Verification,
    #[serde(default)]
    pub expertise: Expertise,
    #[serde(rename = "serviceAreas", default)]
    pub service_areas: ServiceAreas,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(rename = "projectHistory", default)]
    pub project_history: Vec<String>,
}

/// Per-factor sub-scores, each in 0-100
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub expertise: f64,
    pub availability: f64,
    pub rating: f64,
    pub location: f64,
    pub budget: f64,
    pub timeline: f64,
    pub urgency: f64,
}

/// A contractor with its composite score for one matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub contractor: ContractorProfile,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn contractor_id(&self) -> &str {
        &self.contractor.id
    }
}

/// Scoring weights, one per factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub expertise: f64,
    pub availability: f64,
    pub rating: f64,
    pub location: f64,
    pub budget: f64,
    pub timeline: f64,
    pub urgency: f64,
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.expertise
            + self.availability
            + self.rating
            + self.location
            + self.budget
            + self.timeline
            + self.urgency
    }

    /// Weights must be non-negative and sum to 1.0 so that composite scores
    /// stay on the 0-100 scale.
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.expertise,
            self.availability,
            self.rating,
            self.location,
            self.budget,
            self.timeline,
            self.urgency,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("scoring weights must be finite and non-negative".to_string());
        }
        if (self.total() - 1.0).abs() > 1e-6 {
            return Err(format!("scoring weights must sum to 1.0, got {:.4}", self.total()));
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            expertise: 0.25,
            availability: 0.20,
            rating: 0.20,
            location: 0.15,
            budget: 0.10,
            timeline: 0.05,
            urgency: 0.05,
        }
    }
}

/// Outcome of a matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub success: bool,
    pub matches: Vec<ScoredCandidate>,
    #[serde(rename = "totalAvailable")]
    pub total_available: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MatchResult {
    pub const NO_CONTRACTORS: &'static str = "No contractors available";

    pub fn no_contractors() -> Self {
        Self {
            success: false,
            matches: Vec::new(),
            total_available: 0,
            message: Some(Self::NO_CONTRACTORS.to_string()),
        }
    }

    pub fn top(&self) -> Option<&ScoredCandidate> {
        self.matches.first()
    }
}

/// Filter derived from a project, shared by the in-process predicate and the
/// directory query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibilityCriteria {
    pub category: Option<String>,
    pub configuration: Option<String>,
    pub property_type: Option<String>,
    pub city: Option<String>,
    pub max_budget: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Requested,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Requested => "Requested",
            ProjectStatus::Assigned => "Assigned",
            ProjectStatus::InProgress => "InProgress",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Cancelled => "Cancelled",
            ProjectStatus::OnHold => "OnHold",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Requested" => Ok(ProjectStatus::Requested),
            "Assigned" => Ok(ProjectStatus::Assigned),
            "InProgress" => Ok(ProjectStatus::InProgress),
            "Completed" => Ok(ProjectStatus::Completed),
            "Cancelled" => Ok(ProjectStatus::Cancelled),
            "OnHold" => Ok(ProjectStatus::OnHold),
            other => Err(format!("unknown project status: {}", other)),
        }
    }
}

/// The slice of a stored project that matching and assignment touch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub contractor_id: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub requirement: ProjectRequirement,
    #[serde(default)]
    pub actual_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub algorithm_score: Option<f64>,
    #[serde(default)]
    pub alternate_contractors: Vec<String>,
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, client_id: impl Into<String>, requirement: ProjectRequirement) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            contractor_id: None,
            status: ProjectStatus::Requested,
            requirement,
            actual_start_date: None,
            algorithm_score: None,
            alternate_contractors: Vec::new(),
        }
    }
}
