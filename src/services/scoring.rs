//! Provider professional score.

use deadpool_redis::Pool as RedisPool;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::keys;

pub const DEFAULT_MISSION_WEIGHT: f64 = 10.0;
pub const DEFAULT_RATING_WEIGHT: f64 = 20.0;

/// Weights of the pro score formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub mission: f64,
    pub rating: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            mission: DEFAULT_MISSION_WEIGHT,
            rating: DEFAULT_RATING_WEIGHT,
        }
    }
}

impl ScoreWeights {
    /// Reads the weights from platform settings.
    pub async fn load(db: &PgPool, cache: &RedisPool) -> AppResult<Self> {
        let mission =
            super::settings::get_f64(db, cache, keys::SCORE_WEIGHT_MISSION, DEFAULT_MISSION_WEIGHT)
                .await?;
        let rating =
            super::settings::get_f64(db, cache, keys::SCORE_WEIGHT_RATING, DEFAULT_RATING_WEIGHT)
                .await?;

        Ok(Self { mission, rating })
    }

    /// `missions × mission weight + rating × rating weight`.
    pub fn score(&self, missions_count: i32, rating: f64) -> f64 {
        f64::from(missions_count).mul_add(self.mission, rating * self.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = ScoreWeights::default();
        assert!((weights.score(0, 0.0)).abs() < f64::EPSILON);
        assert!((weights.score(3, 4.5) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoreWeights {
            mission: 5.0,
            rating: 0.0,
        };
        assert!((weights.score(7, 5.0) - 35.0).abs() < 1e-9);
    }
}
