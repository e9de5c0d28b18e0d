use crate::models::{ContractorProfile, ContractorStatus, EligibilityCriteria, ProjectRequirement};

impl EligibilityCriteria {
    /// Build the hard-filter criteria for a project
    pub fn from_requirement(project: &ProjectRequirement) -> Self {
        Self {
            category: non_empty(project.category.as_deref()),
            configuration: non_empty(project.configuration.as_deref()),
            property_type: non_empty(project.property_type.as_deref()),
            city: project.city().map(str::to_string),
            max_budget: project.budget.amount(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Whether a contractor can take on work at all: active, verified and below
/// its concurrent project limit
#[inline]
pub fn is_available(profile: &ContractorProfile) -> bool {
    profile.status == ContractorStatus::Active
        && profile.verification.profile_verified
        && profile.availability.has_capacity()
}

/// Check a contractor against every hard filter for a project
///
/// Criteria that are `None` do not constrain the result.
#[inline]
pub fn is_eligible(profile: &ContractorProfile, criteria: &EligibilityCriteria) -> bool {
    if !is_available(profile) {
        return false;
    }

    let expertise = &profile.expertise;

    if let Some(category) = &criteria.category {
        if !expertise.categories.contains(category) {
            return false;
        }
    }

    if let Some(configuration) = &criteria.configuration {
        if !expertise.configurations.contains(configuration) {
            return false;
        }
    }

    if let Some(property_type) = &criteria.property_type {
        if !expertise.property_types.contains(property_type) {
            return false;
        }
    }

    if let Some(city) = &criteria.city {
        if !profile.service_areas.covers_city(city) {
            return false;
        }
    }

    if let Some(budget) = criteria.max_budget {
        if profile.pricing.minimum() > budget {
            return false;
        }
    }

    true
}

/// Narrow a directory snapshot down to eligible contractors, keeping order
pub fn filter_eligible(
    contractors: Vec<ContractorProfile>,
    criteria: &EligibilityCriteria,
) -> Vec<ContractorProfile> {
    contractors
        .into_iter()
        .filter(|profile| is_eligible(profile, criteria))
        .collect()
}
