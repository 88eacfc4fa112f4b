//! Grade eligibility and assignment.
//!
//! A provider reaches a grade when its missions, average rating and seniority
//! all meet the grade thresholds. Automatic checks only move a provider to a
//! different eligible grade; they never clear one.

use chrono::{DateTime, Datelike, Utc};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::{
    AttributionKind, AttributionRepository, Grade, GradeRepository, Provider, ProviderRepository,
};

/// Whole months elapsed between `since` and `now`.
pub fn seniority_months(since: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    if now <= since {
        return 0;
    }

    let mut months =
        (now.year() - since.year()) * 12 + now.month() as i32 - since.month() as i32;

    // The last month only counts once its day and time have been reached.
    let since_in_month = (since.day(), since.time());
    let now_in_month = (now.day(), now.time());
    if now_in_month < since_in_month {
        months -= 1;
    }

    months.max(0)
}

/// Highest grade whose thresholds are all met.
///
/// Grades are ranked by missions threshold, then rating threshold.
pub fn eligible_grade(
    grades: &[Grade],
    missions_count: i32,
    rating: f64,
    months: i32,
) -> Option<&Grade> {
    let mut ranked: Vec<&Grade> = grades.iter().collect();
    ranked.sort_by(|a, b| {
        b.missions_threshold
            .cmp(&a.missions_threshold)
            .then(b.rating_threshold.total_cmp(&a.rating_threshold))
    });

    ranked.into_iter().find(|grade| {
        missions_count >= grade.missions_threshold
            && rating >= grade.rating_threshold
            && months >= grade.seniority_threshold_months
    })
}

/// Grade the provider should move to, if different from its current one.
pub fn grade_change<'a>(
    grades: &'a [Grade],
    provider: &Provider,
    now: DateTime<Utc>,
) -> Option<&'a Grade> {
    let months = seniority_months(provider.created_at, now);
    eligible_grade(grades, provider.missions_count, provider.rating, months)
        .filter(|grade| provider.grade_id != Some(grade.id))
}

async fn apply_change(db: &PgPool, provider: &Provider, grade: &Grade) -> AppResult<()> {
    ProviderRepository::set_grade(db, provider.id, Some(grade.id)).await?;
    AttributionRepository::record(db, provider.id, grade.id, None, AttributionKind::Automatic)
        .await?;

    tracing::info!(
        provider_id = provider.id,
        grade = %grade.slug,
        "Provider grade updated"
    );

    Ok(())
}

/// Re-evaluates one provider. Returns the newly assigned grade, if any.
pub async fn check_provider(db: &PgPool, provider: &Provider) -> AppResult<Option<Grade>> {
    let grades = GradeRepository::all(db).await?;

    match grade_change(&grades, provider, Utc::now()) {
        Some(grade) => {
            apply_change(db, provider, grade).await?;
            Ok(Some(grade.clone()))
        }
        None => Ok(None),
    }
}

/// Re-evaluates every provider and returns how many changed grade.
pub async fn sync_all(db: &PgPool) -> AppResult<usize> {
    let grades = GradeRepository::all(db).await?;
    let providers = ProviderRepository::all(db).await?;
    let now = Utc::now();

    let mut changed = 0;
    for provider in &providers {
        if let Some(grade) = grade_change(&grades, provider, now) {
            apply_change(db, provider, grade).await?;
            changed += 1;
        }
    }

    tracing::info!(providers = providers.len(), changed, "Grade sync finished");

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn grade(id: i64, slug: &str, missions: i32, rating: f64, months: i32) -> Grade {
        let now = Utc::now();
        Grade {
            id,
            name: slug.to_string(),
            slug: slug.to_string(),
            color: String::new(),
            bg_color: String::new(),
            border_color: String::new(),
            icon: String::new(),
            missions_threshold: missions,
            rating_threshold: rating,
            seniority_threshold_months: months,
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded() -> Vec<Grade> {
        vec![
            grade(1, "bronze", 5, 4.0, 1),
            grade(2, "argent", 15, 4.5, 6),
            grade(3, "or", 25, 4.8, 12),
        ]
    }

    fn provider(
        missions: i32,
        rating: f64,
        created_at: DateTime<Utc>,
        grade_id: Option<i64>,
    ) -> Provider {
        Provider {
            id: 10,
            user_id: 20,
            category_id: None,
            city: None,
            hourly_rate: None,
            skills: None,
            description: None,
            experience: None,
            diplomas: None,
            birth_date: None,
            availabilities: json!({}),
            is_available: true,
            is_visible: true,
            rating,
            missions_count: missions,
            grade_id,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_seniority_months() {
        assert_eq!(seniority_months(at(2026, 1, 15), at(2026, 1, 30)), 0);
        assert_eq!(seniority_months(at(2026, 1, 15), at(2026, 2, 14)), 0);
        assert_eq!(seniority_months(at(2026, 1, 15), at(2026, 2, 15)), 1);
        assert_eq!(seniority_months(at(2025, 6, 1), at(2026, 6, 1)), 12);
        assert_eq!(seniority_months(at(2026, 6, 1), at(2025, 6, 1)), 0);
    }

    #[test]
    fn test_eligible_grade_picks_highest() {
        let grades = seeded();
        let found = eligible_grade(&grades, 30, 4.9, 24).unwrap();
        assert_eq!(found.slug, "or");
    }

    #[test]
    fn test_eligible_grade_requires_every_threshold() {
        let grades = seeded();

        // Enough missions for gold but rating only reaches silver
        assert_eq!(eligible_grade(&grades, 30, 4.6, 24).unwrap().slug, "argent");
        // Too recent for anything above bronze
        assert_eq!(eligible_grade(&grades, 30, 5.0, 2).unwrap().slug, "bronze");
        assert!(eligible_grade(&grades, 4, 5.0, 24).is_none());
        assert!(eligible_grade(&grades, 10, 3.9, 24).is_none());
    }

    #[test]
    fn test_eligible_grade_ties_broken_by_rating() {
        let grades = vec![grade(1, "low", 10, 3.0, 0), grade(2, "high", 10, 4.0, 0)];
        assert_eq!(eligible_grade(&grades, 10, 4.5, 0).unwrap().slug, "high");
        assert_eq!(eligible_grade(&grades, 10, 3.5, 0).unwrap().slug, "low");
    }

    #[test]
    fn test_grade_change_skips_current_grade() {
        let grades = seeded();
        let now = at(2026, 6, 1);

        let current = provider(6, 4.2, at(2026, 1, 1), Some(1));
        assert!(grade_change(&grades, &current, now).is_none());

        let promoted = provider(16, 4.6, at(2025, 1, 1), Some(1));
        assert_eq!(grade_change(&grades, &promoted, now).unwrap().slug, "argent");
    }

    #[test]
    fn test_grade_change_never_clears() {
        let grades = seeded();
        let fallen = provider(0, 0.0, at(2026, 5, 31), Some(3));
        assert!(grade_change(&grades, &fallen, at(2026, 6, 1)).is_none());
    }
}
