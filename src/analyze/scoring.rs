//! Interest score: share of likes among all votes, as a percentage.
//!
//! Unvoted items sit at a neutral 50 so fresh blinks are not buried below
//! disliked ones.

pub const NEUTRAL_INTEREST: f64 = 50.0;

/// `likes / (likes + dislikes) * 100`, or 50.0 with no votes.
pub fn interest(likes: u64, dislikes: u64) -> f64 {
    let total = likes.saturating_add(dislikes);
    if total == 0 {
        return NEUTRAL_INTEREST;
    }
    likes as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_votes_is_exactly_neutral() {
        assert_eq!(interest(0, 0), 50.0);
    }

    #[test]
    fn ratio_as_percentage() {
        assert_eq!(interest(10, 0), 100.0);
        assert_eq!(interest(0, 5), 0.0);
        assert_eq!(interest(5, 5), 50.0);
        assert!((interest(1, 3) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn more_likes_never_lowers_interest() {
        for dislikes in [0u64, 1, 3, 10, 250] {
            let mut last = interest(0, dislikes);
            for likes in 1..200u64 {
                let now = interest(likes, dislikes);
                assert!(now >= last, "likes={likes} dislikes={dislikes}");
                last = now;
            }
        }
    }

    #[test]
    fn stays_in_percent_range() {
        for (l, d) in [(0, 0), (1, 0), (0, 1), (u64::MAX, 1), (7, 13)] {
            let v = interest(l, d);
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
