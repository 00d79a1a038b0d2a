//! Elo rating update applied when a game ends.

/// Match outcome from the perspective of the player whose rating is being
/// recalculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    fn score(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }
}

const K_FACTOR: f64 = 32.0;
const C_FACTOR: f64 = 400.0;

/// Computes the updated Elo rating for a player rated `rating_a` against an
/// opponent rated `rating_b`, given the match `outcome` from `rating_a`'s
/// perspective.
pub fn calculate_elo(rating_a: i64, rating_b: i64, outcome: Outcome) -> i64 {
    let qa = 10f64.powf(rating_a as f64 / C_FACTOR);
    let qb = 10f64.powf(rating_b as f64 / C_FACTOR);
    let ea = qa / (qa + qb);
    (rating_a as f64 + K_FACTOR * (outcome.score() - ea)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_win_gains_half_k() {
        let updated = calculate_elo(1000, 1000, Outcome::Win);
        assert_eq!(updated, 1016);
    }

    #[test]
    fn equal_ratings_draw_is_unchanged() {
        let updated = calculate_elo(1000, 1000, Outcome::Draw);
        assert_eq!(updated, 1000);
    }

    #[test]
    fn underdog_win_gains_more_than_k_half() {
        let updated = calculate_elo(1000, 1400, Outcome::Win);
        assert!(updated - 1000 > 16);
    }

    #[test]
    fn favorite_loss_loses_more_than_k_half() {
        let updated = calculate_elo(1400, 1000, Outcome::Loss);
        assert!(1400 - updated > 16);
    }
}
