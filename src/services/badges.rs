//! Badge synchronisation from the pro score.

use deadpool_redis::Pool as RedisPool;
use sqlx::PgPool;

use super::scoring::ScoreWeights;
use crate::error::AppResult;
use crate::models::{Badge, BadgeRepository, Provider};

/// Ids of the badges whose threshold the score reaches.
pub fn eligible_badge_ids(badges: &[Badge], score: f64) -> Vec<i64> {
    badges
        .iter()
        .filter(|badge| f64::from(badge.threshold) <= score)
        .map(|badge| badge.id)
        .collect()
}

/// Makes the provider hold exactly the badges its current score earns.
pub async fn sync_badges(
    db: &PgPool,
    cache: &RedisPool,
    provider: &Provider,
) -> AppResult<Vec<i64>> {
    let weights = ScoreWeights::load(db, cache).await?;
    let score = weights.score(provider.missions_count, provider.rating);
    let badges = BadgeRepository::all(db).await?;

    let earned = eligible_badge_ids(&badges, score);
    BadgeRepository::replace_for_provider(db, provider.id, &earned).await?;

    tracing::debug!(
        provider_id = provider.id,
        score,
        badges = earned.len(),
        "Provider badges synced"
    );

    Ok(earned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn badge(id: i64, threshold: i32) -> Badge {
        let now = Utc::now();
        Badge {
            id,
            name: format!("badge-{id}"),
            slug: format!("badge-{id}"),
            threshold,
            icon: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_eligible_badges_threshold_inclusive() {
        let badges = vec![badge(1, 100), badge(2, 250), badge(3, 500)];

        assert!(eligible_badge_ids(&badges, 99.9).is_empty());
        assert_eq!(eligible_badge_ids(&badges, 100.0), vec![1]);
        assert_eq!(eligible_badge_ids(&badges, 260.0), vec![1, 2]);
        assert_eq!(eligible_badge_ids(&badges, 1000.0), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_threshold_badge_always_earned() {
        let badges = vec![badge(7, 0)];
        assert_eq!(eligible_badge_ids(&badges, 0.0), vec![7]);
    }
}
