use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;

use crate::models::{
    Availability, ContractorProfile, Coordinates, EligibilityCriteria, Expertise, Pricing,
    ProjectRecord, ProjectRequirement, ProjectStatus, Ratings, ServiceAreas, Verification,
};
use crate::services::directory::{
    AssignmentError, AssignmentRequest, AssignmentSink, ContractorDirectory, DirectoryError,
};

const CONTRACTOR_COLUMNS: &str = r#"
    id, business_name, status, profile_verified,
    categories, subcategories, configurations, property_types, specializations,
    service_area_primary, service_area_secondary, max_travel_distance_km,
    primary_latitude, primary_longitude,
    minimum_project, current_projects, max_concurrent_projects,
    rating_overall, total_reviews, project_history
"#;

const PROJECT_COLUMNS: &str = r#"
    id, client_id, contractor_id, status, requirement,
    actual_start_date, algorithm_score, alternate_contractors
"#;

/// PostgreSQL-backed contractor directory and project store
///
/// Eligibility is pushed down into the query, and assignment runs as a
/// single transaction whose capacity check and increment are one
/// conditional UPDATE.
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    /// Create a new directory from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new directory from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, DirectoryError> {
        tracing::info!("Connecting to PostgreSQL contractor directory");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Take one slot of capacity inside an open transaction
    ///
    /// Returns false when the contractor is already at its limit; the row is
    /// left untouched in that case.
    async fn increment_load(
        tx: &mut Transaction<'_, Postgres>,
        contractor_id: &str,
        project_id: &str,
    ) -> Result<bool, AssignmentError> {
        let query = r#"
            UPDATE contractors
            SET current_projects = current_projects + 1,
                project_history = array_append(project_history, $2),
                updated_at = NOW()
            WHERE id = $1 AND current_projects < max_concurrent_projects
        "#;

        let result = sqlx::query(query)
            .bind(contractor_id)
            .bind(project_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn contractor_exists(
        tx: &mut Transaction<'_, Postgres>,
        contractor_id: &str,
    ) -> Result<bool, AssignmentError> {
        let row = sqlx::query("SELECT 1 FROM contractors WHERE id = $1")
            .bind(contractor_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }
}

fn invalid(err: impl std::fmt::Display) -> DirectoryError {
    DirectoryError::InvalidRecord(err.to_string())
}

fn non_negative(value: i32, column: &str) -> Result<u32, DirectoryError> {
    u32::try_from(value).map_err(|_| invalid(format!("{} is negative: {}", column, value)))
}

fn contractor_from_row(row: &PgRow) -> Result<ContractorProfile, DirectoryError> {
    let status: String = row.try_get("status")?;
    let latitude: Option<f64> = row.try_get("primary_latitude")?;
    let longitude: Option<f64> = row.try_get("primary_longitude")?;

    Ok(ContractorProfile {
        id: row.try_get("id")?,
        business_name: row.try_get("business_name")?,
        status: status.parse().map_err(invalid)?,
        verification: Verification {
            profile_verified: row.try_get("profile_verified")?,
        },
        expertise: Expertise {
            categories: row.try_get("categories")?,
            subcategories: row.try_get("subcategories")?,
            configurations: row.try_get("configurations")?,
            property_types: row.try_get("property_types")?,
            specializations: row.try_get("specializations")?,
        },
        service_areas: ServiceAreas {
            primary: row.try_get("service_area_primary")?,
            secondary: row.try_get("service_area_secondary")?,
            max_travel_distance: row.try_get("max_travel_distance_km")?,
            primary_coordinates: latitude
                .zip(longitude)
                .map(|(lat, lon)| Coordinates::new(lat, lon)),
        },
        pricing: Pricing {
            minimum_project: row.try_get("minimum_project")?,
        },
        availability: Availability {
            current_projects: non_negative(row.try_get("current_projects")?, "current_projects")?,
            max_concurrent_projects: non_negative(
                row.try_get("max_concurrent_projects")?,
                "max_concurrent_projects",
            )?,
        },
        ratings: Ratings {
            overall: row.try_get("rating_overall")?,
            total_reviews: non_negative(row.try_get("total_reviews")?, "total_reviews")?,
        },
        project_history: row.try_get("project_history")?,
    })
}

fn project_from_row(row: &PgRow) -> Result<ProjectRecord, DirectoryError> {
    let status: String = row.try_get("status")?;
    let requirement: Json<ProjectRequirement> = row.try_get("requirement")?;

    Ok(ProjectRecord {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        contractor_id: row.try_get("contractor_id")?,
        status: status.parse().map_err(invalid)?,
        requirement: requirement.0,
        actual_start_date: row.try_get("actual_start_date")?,
        algorithm_score: row.try_get("algorithm_score")?,
        alternate_contractors: row.try_get("alternate_contractors")?,
    })
}

#[async_trait]
impl ContractorDirectory for PostgresDirectory {
    async fn find_eligible(
        &self,
        criteria: &EligibilityCriteria,
    ) -> Result<Vec<ContractorProfile>, DirectoryError> {
        let query = format!(
            r#"
            SELECT {CONTRACTOR_COLUMNS}
            FROM contractors
            WHERE status = 'Active'
              AND profile_verified = TRUE
              AND current_projects < max_concurrent_projects
              AND ($1::TEXT IS NULL OR $1 = ANY(categories))
              AND ($2::TEXT IS NULL OR $2 = ANY(configurations))
              AND ($3::TEXT IS NULL OR $3 = ANY(property_types))
              AND ($4::TEXT IS NULL OR service_area_primary = $4 OR $4 = ANY(service_area_secondary))
              AND ($5::DOUBLE PRECISION IS NULL OR COALESCE(minimum_project, 0) <= $5)
            ORDER BY created_at, id
            "#
        );

        let rows = sqlx::query(&query)
            .bind(criteria.category.as_deref())
            .bind(criteria.configuration.as_deref())
            .bind(criteria.property_type.as_deref())
            .bind(criteria.city.as_deref())
            .bind(criteria.max_budget)
            .fetch_all(&self.pool)
            .await?;

        let contractors = rows
            .iter()
            .map(contractor_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Directory returned {} eligible contractors", contractors.len());

        Ok(contractors)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl AssignmentSink for PostgresDirectory {
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectRecord>, AssignmentError> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(project_from_row).transpose()?)
    }

    async fn assign(&self, request: &AssignmentRequest) -> Result<ProjectRecord, AssignmentError> {
        let mut tx = self.pool.begin().await?;

        // Lock the project row so concurrent runs for the same project serialize
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM projects WHERE id = $1 FOR UPDATE")
                .bind(&request.project_id)
                .fetch_optional(&mut *tx)
                .await?;
        let status: ProjectStatus = current
            .ok_or_else(|| AssignmentError::ProjectNotFound(request.project_id.clone()))?
            .parse()
            .map_err(invalid)?;
        if status != ProjectStatus::Requested {
            return Err(AssignmentError::InvalidTransition {
                project_id: request.project_id.clone(),
                status,
            });
        }

        if !Self::increment_load(&mut tx, &request.contractor_id, &request.project_id).await? {
            let err = if Self::contractor_exists(&mut tx, &request.contractor_id).await? {
                AssignmentError::Conflict {
                    contractor_id: request.contractor_id.clone(),
                }
            } else {
                AssignmentError::ContractorNotFound(request.contractor_id.clone())
            };
            tx.rollback().await?;
            return Err(err);
        }

        let query = format!(
            r#"
            UPDATE projects
            SET contractor_id = $2,
                status = 'Assigned',
                actual_start_date = $3,
                algorithm_score = $4,
                alternate_contractors = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(&request.project_id)
            .bind(&request.contractor_id)
            .bind(request.assigned_at)
            .bind(request.score)
            .bind(&request.alternates)
            .fetch_one(&mut *tx)
            .await?;
        let project = project_from_row(&row)?;

        tx.commit().await?;

        tracing::debug!(
            "Committed assignment: project {} -> contractor {}",
            request.project_id,
            request.contractor_id
        );

        Ok(project)
    }

    async fn record_alternates(
        &self,
        project_id: &str,
        alternates: &[String],
    ) -> Result<ProjectRecord, AssignmentError> {
        let query = format!(
            r#"
            UPDATE projects
            SET alternate_contractors = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'Requested'
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(project_id)
            .bind(alternates)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(project_from_row(&row)?),
            None => {
                // Missing, or moved past Requested by a concurrent run
                let current: Option<String> =
                    sqlx::query_scalar("SELECT status FROM projects WHERE id = $1")
                        .bind(project_id)
                        .fetch_optional(&self.pool)
                        .await?;
                let status: ProjectStatus = current
                    .ok_or_else(|| AssignmentError::ProjectNotFound(project_id.to_string()))?
                    .parse()
                    .map_err(invalid)?;
                Err(AssignmentError::InvalidTransition {
                    project_id: project_id.to_string(),
                    status,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // Needs a reachable database:
    // DATABASE_URL=postgres://... cargo test -- --ignored
    async fn connect() -> PostgresDirectory {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PostgresDirectory::from_settings(&url, Some(4), Some(1), None, None)
            .await
            .expect("Failed to connect to PostgreSQL")
    }

    async fn seed(directory: &PostgresDirectory, contractor_id: &str, project_id: &str) {
        sqlx::query(
            r#"
            INSERT INTO contractors (id, status, profile_verified, categories, current_projects, max_concurrent_projects)
            VALUES ($1, 'Active', TRUE, ARRAY['Kitchen'], 2, 3)
            ON CONFLICT (id) DO UPDATE SET current_projects = 2, project_history = '{}'
            "#,
        )
        .bind(contractor_id)
        .execute(&directory.pool)
        .await
        .unwrap();

        sqlx::query(
            r#"
            INSERT INTO projects (id, client_id, status, requirement)
            VALUES ($1, 'client-1', 'Requested', '{}'::jsonb)
            ON CONFLICT (id) DO UPDATE SET status = 'Requested', contractor_id = NULL
            "#,
        )
        .bind(project_id)
        .execute(&directory.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_assign_respects_capacity() {
        let directory = connect().await;
        seed(&directory, "pg-c1", "pg-p1").await;
        seed(&directory, "pg-c1", "pg-p2").await;

        let request = |project_id: &str| AssignmentRequest {
            project_id: project_id.to_string(),
            contractor_id: "pg-c1".to_string(),
            score: 82.5,
            alternates: vec![],
            assigned_at: Utc::now(),
        };

        let first = directory.assign(&request("pg-p1")).await.unwrap();
        assert_eq!(first.status, ProjectStatus::Assigned);

        let second = directory.assign(&request("pg-p2")).await.unwrap_err();
        assert!(matches!(second, AssignmentError::Conflict { .. }));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_record_alternates_requires_requested() {
        let directory = connect().await;
        seed(&directory, "pg-c3", "pg-p4").await;

        directory
            .assign(&AssignmentRequest {
                project_id: "pg-p4".to_string(),
                contractor_id: "pg-c3".to_string(),
                score: 90.0,
                alternates: vec![],
                assigned_at: Utc::now(),
            })
            .await
            .unwrap();

        let err = directory
            .record_alternates("pg-p4", &["pg-c9".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::InvalidTransition { .. }));

        let project = directory.fetch_project("pg-p4").await.unwrap().unwrap();
        assert!(project.alternate_contractors.is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_find_eligible_query() {
        let directory = connect().await;
        seed(&directory, "pg-c2", "pg-p3").await;

        let criteria = EligibilityCriteria {
            category: Some("Kitchen".to_string()),
            ..EligibilityCriteria::default()
        };
        let eligible = directory.find_eligible(&criteria).await.unwrap();
        assert!(eligible.iter().all(|c| c.availability.has_capacity()));
    }
}
