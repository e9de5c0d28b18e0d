use chrono::{DateTime, Utc};

use crate::core::distance::haversine_distance;
use crate::models::{ContractorProfile, ProjectRequirement, ScoreBreakdown, ScoringWeights, UrgencyLevel};

/// Sub-score used whenever the input needed for a factor is missing
pub const NEUTRAL_SCORE: f64 = 50.0;

const SECONDS_PER_DAY: i64 = 86_400;

/// Calculate a match score (0-100) for a contractor against a project
///
/// Scoring formula:
/// score = (
///     expertise * 0.25 +      # category/configuration/property type/specializations
///     availability * 0.20 +   # free capacity, bonus when idle
///     rating * 0.20 +         # star rating plus review-count bonus
///     location * 0.15 +       # distance within travel radius
///     budget * 0.10 +         # project budget vs contractor minimum
///     timeline * 0.05 +       # lead time before preferred start
///     urgency * 0.05          # urgency vs current load
/// )
///
/// The result is rounded to two decimals.
pub fn calculate_match_score(
    profile: &ContractorProfile,
    project: &ProjectRequirement,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> (f64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        expertise: calculate_expertise_score(profile, project),
        availability: calculate_availability_score(profile),
        rating: calculate_rating_score(profile),
        location: calculate_location_score(profile, project),
        budget: calculate_budget_score(profile, project),
        timeline: calculate_timeline_score(project, now),
        urgency: calculate_urgency_score(profile, project),
    };

    let total_score = breakdown.expertise * weights.expertise
        + breakdown.availability * weights.availability
        + breakdown.rating * weights.rating
        + breakdown.location * weights.location
        + breakdown.budget * weights.budget
        + breakdown.timeline * weights.timeline
        + breakdown.urgency * weights.urgency;

    (round_score(total_score.clamp(0.0, 100.0)), breakdown)
}

#[inline]
fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[inline]
fn bounded(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Expertise score (0-100)
/// 40 for category, 30 for configuration, 20 for property type, and up to 10
/// for special requirements the contractor specializes in
pub fn calculate_expertise_score(profile: &ContractorProfile, project: &ProjectRequirement) -> f64 {
    let expertise = &profile.expertise;
    let mut score = 0.0;

    let offers = |tags: &[String], wanted: &Option<String>| {
        wanted.as_ref().is_some_and(|w| tags.contains(w))
    };

    if offers(expertise.categories.as_slice(), &project.category) {
        score += 40.0;
    }
    if offers(expertise.configurations.as_slice(), &project.configuration) {
        score += 30.0;
    }
    if offers(expertise.property_types.as_slice(), &project.property_type) {
        score += 20.0;
    }

    let matching_specializations = project
        .special_requirements
        .iter()
        .filter(|req| expertise.specializations.contains(*req))
        .count();
    score += (matching_specializations as f64 * 5.0).min(10.0);

    bounded(score)
}

/// Availability score (0-100)
/// Proportional to free capacity, +20 for a contractor with no projects
pub fn calculate_availability_score(profile: &ContractorProfile) -> f64 {
    let availability = &profile.availability;
    if availability.max_concurrent_projects == 0 {
        return 0.0;
    }

    let load = availability.current_projects as f64 / availability.max_concurrent_projects as f64;
    let score = (1.0 - load) * 100.0;

    if availability.current_projects == 0 {
        return bounded(score + 20.0);
    }

    bounded(score)
}

/// Rating score (0-100)
/// Stars scaled to 80, plus a bonus for well-reviewed contractors
pub fn calculate_rating_score(profile: &ContractorProfile) -> f64 {
    let ratings = &profile.ratings;
    let base = (ratings.overall / 5.0) * 80.0;

    let review_bonus = match ratings.total_reviews {
        n if n > 50 => 20.0,
        n if n > 20 => 15.0,
        n if n > 10 => 10.0,
        n if n > 5 => 5.0,
        _ => 0.0,
    };

    bounded(base + review_bonus)
}

/// Location score (0-100)
/// Neutral when either side has no coordinates. Inside the travel radius the
/// score falls linearly from 100 to 50; outside it is 0.
pub fn calculate_location_score(profile: &ContractorProfile, project: &ProjectRequirement) -> f64 {
    let Some(project_location) = project.coordinates() else {
        return NEUTRAL_SCORE;
    };
    let Some(contractor_location) = profile.service_areas.coordinates() else {
        return NEUTRAL_SCORE;
    };

    let distance_km = haversine_distance(contractor_location, project_location);
    let max_distance_km = profile.service_areas.max_travel_km();

    if distance_km <= max_distance_km {
        return bounded((100.0 - (distance_km / max_distance_km) * 50.0).max(50.0));
    }

    0.0
}

/// Budget score (0-100)
/// Projects worth more than the contractor's minimum score higher; a budget
/// below the minimum scores 0
pub fn calculate_budget_score(profile: &ContractorProfile, project: &ProjectRequirement) -> f64 {
    let Some(project_budget) = project.budget.amount() else {
        return NEUTRAL_SCORE;
    };

    let minimum = profile.pricing.minimum();
    if project_budget < minimum {
        return 0.0;
    }

    let denominator = if minimum > 0.0 { minimum } else { 1.0 };
    bounded((50.0 + (project_budget / denominator) * 10.0).min(100.0))
}

/// Timeline score (0-100)
/// More lead time before the preferred start is better; a start date in the
/// past scores 0
pub fn calculate_timeline_score(project: &ProjectRequirement, now: DateTime<Utc>) -> f64 {
    let Some(start) = project.timeline.preferred_start_date else {
        return NEUTRAL_SCORE;
    };

    // Floor division so that a start a few hours ago counts as -1 day
    let days_until_start = (start - now).num_seconds().div_euclid(SECONDS_PER_DAY);

    match days_until_start {
        d if d > 30 => 100.0,
        d if d > 14 => 80.0,
        d if d > 7 => 60.0,
        d if d > 3 => 40.0,
        d if d >= 0 => 20.0,
        _ => 0.0,
    }
}

/// Urgency score (0-100)
/// High urgency favours idle contractors; other levels map to fixed scores
pub fn calculate_urgency_score(profile: &ContractorProfile, project: &ProjectRequirement) -> f64 {
    let current = profile.availability.current_projects;

    match (project.matching.urgency_level, current) {
        (Some(UrgencyLevel::High), 0) => 100.0,
        (Some(UrgencyLevel::High), 1) => 80.0,
        (Some(UrgencyLevel::Medium), _) => 60.0,
        (Some(UrgencyLevel::Low), _) => 40.0,
        _ => NEUTRAL_SCORE,
    }
}
