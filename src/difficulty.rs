/**
 * Rolling accuracy, the adaptive difficulty policy and filtering a pool down to one
 * difficulty tier.
 *
 * The policy moves at most one tier per evaluation: with accuracy at or above the raise
 * threshold it steps up, below the lower threshold it steps down. Sustained high or low
 * accuracy therefore walks towards the extreme tier one session at a time.
 */
use tracing::debug;

use super::quiz::{Difficulty, QuestionItem};


pub const DEFAULT_RAISE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_LOWER_THRESHOLD: f64 = 0.55;


/// Return the fraction of `true` among the last `window` entries of `history` (oldest
/// first), or `None` if there are no such entries.
pub fn rolling_accuracy(history: &[bool], window: usize) -> Option<f64> {
    let n = window.min(history.len());
    if n == 0 {
        return None;
    }
    let recent = &history[history.len() - n..];
    let correct = recent.iter().filter(|&&ok| ok).count();
    Some(correct as f64 / n as f64)
}


/// Thresholds for the difficulty policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub raise: f64,
    pub lower: f64,
}


impl Default for Thresholds {
    fn default() -> Self {
        Thresholds { raise: DEFAULT_RAISE_THRESHOLD, lower: DEFAULT_LOWER_THRESHOLD }
    }
}


/// Decide the difficulty tier to draw from.
///
/// Returns `base` unchanged when `adaptive` is off or there is no accuracy yet. The
/// raise condition is checked first, so if the thresholds are misconfigured with
/// `raise <= lower` an accuracy satisfying both still raises.
pub fn decide_difficulty(
    base: Difficulty,
    adaptive: bool,
    accuracy: Option<f64>,
    thresholds: Thresholds,
) -> Difficulty {
    let accuracy = match accuracy {
        Some(accuracy) if adaptive => accuracy,
        _ => return base,
    };

    let scale = &Difficulty::SCALE;
    let mut index = scale.iter().position(|&d| d == base).unwrap_or(1);
    if accuracy >= thresholds.raise && index < scale.len() - 1 {
        index += 1;
    } else if accuracy < thresholds.lower && index > 0 {
        index -= 1;
    }

    let decided = scale[index];
    if decided != base {
        debug!(from = %base, to = %decided, accuracy, "adjusting difficulty");
    }
    decided
}


/// The order in which tiers are tried when no question has the wanted tier.
fn fallback_order(want: Difficulty) -> [Difficulty; 3] {
    match want {
        Difficulty::Standard => [Difficulty::Standard, Difficulty::Easy, Difficulty::Hard],
        Difficulty::Easy => [Difficulty::Easy, Difficulty::Standard, Difficulty::Hard],
        Difficulty::Hard => [Difficulty::Hard, Difficulty::Standard, Difficulty::Easy],
    }
}


/// Return the questions of tier `want`, keeping their order. If there are none, the
/// nearest non-empty tier is used instead, and if every tier is empty the whole pool is
/// returned. The result is only empty when `items` is.
pub fn filter_by_difficulty(items: &[QuestionItem], want: Difficulty) -> Vec<&QuestionItem> {
    for tier in fallback_order(want).iter() {
        let group: Vec<&QuestionItem> = items.iter().filter(|q| q.difficulty == *tier).collect();
        if !group.is_empty() {
            if *tier != want {
                debug!(wanted = %want, using = %tier, "no questions of the wanted difficulty");
            }
            return group;
        }
    }
    items.iter().collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_accuracy_uses_recent_window() {
        let history = [true, false, true, true];
        assert_eq!(rolling_accuracy(&history, 4), Some(0.75));
        assert_eq!(rolling_accuracy(&history, 2), Some(1.0));
        assert_eq!(rolling_accuracy(&history, 100), Some(0.75));
        assert_eq!(rolling_accuracy(&[], 10), None);
        assert_eq!(rolling_accuracy(&history, 0), None);
    }

    #[test]
    fn high_accuracy_raises_one_tier() {
        let t = Thresholds::default();
        assert_eq!(decide_difficulty(Difficulty::Standard, true, Some(0.9), t), Difficulty::Hard);
        assert_eq!(decide_difficulty(Difficulty::Hard, true, Some(0.9), t), Difficulty::Hard);
        assert_eq!(decide_difficulty(Difficulty::Easy, true, Some(0.85), t), Difficulty::Standard);
    }

    #[test]
    fn low_accuracy_lowers_one_tier() {
        let t = Thresholds::default();
        assert_eq!(decide_difficulty(Difficulty::Standard, true, Some(0.4), t), Difficulty::Easy);
        assert_eq!(decide_difficulty(Difficulty::Easy, true, Some(0.0), t), Difficulty::Easy);
        assert_eq!(decide_difficulty(Difficulty::Hard, true, Some(0.1), t), Difficulty::Standard);
    }

    #[test]
    fn middling_accuracy_keeps_tier() {
        let t = Thresholds::default();
        assert_eq!(decide_difficulty(Difficulty::Standard, true, Some(0.55), t), Difficulty::Standard);
        assert_eq!(decide_difficulty(Difficulty::Standard, true, Some(0.84), t), Difficulty::Standard);
    }

    #[test]
    fn no_adaptation_without_flag_or_data() {
        let t = Thresholds::default();
        assert_eq!(decide_difficulty(Difficulty::Standard, false, Some(0.1), t), Difficulty::Standard);
        assert_eq!(decide_difficulty(Difficulty::Standard, true, None, t), Difficulty::Standard);
    }

    #[test]
    fn repeated_evaluation_converges_step_by_step() {
        let t = Thresholds::default();
        let first = decide_difficulty(Difficulty::Hard, true, Some(0.2), t);
        let second = decide_difficulty(first, true, Some(0.2), t);
        let third = decide_difficulty(second, true, Some(0.2), t);
        assert_eq!(first, Difficulty::Standard);
        assert_eq!(second, Difficulty::Easy);
        assert_eq!(third, Difficulty::Easy);
    }

    #[test]
    fn misconfigured_thresholds_prefer_raising() {
        let t = Thresholds { raise: 0.3, lower: 0.6 };
        assert_eq!(decide_difficulty(Difficulty::Standard, true, Some(0.5), t), Difficulty::Hard);
    }

    #[test]
    fn filter_keeps_wanted_tier_in_order() {
        let pool = vec![
            q("e1", Difficulty::Easy),
            q("s1", Difficulty::Standard),
            q("e2", Difficulty::Easy),
        ];
        let easy = ids(&filter_by_difficulty(&pool, Difficulty::Easy));
        assert_eq!(easy, vec!["e1", "e2"]);
    }

    #[test]
    fn filter_falls_back_to_nearest_tier() {
        let pool = vec![q("e1", Difficulty::Easy), q("h1", Difficulty::Hard)];
        assert_eq!(ids(&filter_by_difficulty(&pool, Difficulty::Standard)), vec!["e1"]);

        let pool = vec![q("e1", Difficulty::Easy), q("s1", Difficulty::Standard)];
        assert_eq!(ids(&filter_by_difficulty(&pool, Difficulty::Hard)), vec!["s1"]);

        let pool = vec![q("h1", Difficulty::Hard), q("s1", Difficulty::Standard)];
        assert_eq!(ids(&filter_by_difficulty(&pool, Difficulty::Easy)), vec!["s1"]);
    }

    #[test]
    fn filter_of_empty_pool_is_empty() {
        assert!(filter_by_difficulty(&[], Difficulty::Hard).is_empty());
    }

    #[test]
    fn filter_is_idempotent() {
        let pool = vec![
            q("e1", Difficulty::Easy),
            q("s1", Difficulty::Standard),
            q("s2", Difficulty::Standard),
        ];
        let once: Vec<QuestionItem> =
            filter_by_difficulty(&pool, Difficulty::Hard).into_iter().cloned().collect();
        let twice = filter_by_difficulty(&once, Difficulty::Hard);
        assert_eq!(ids(&twice), vec!["s1", "s2"]);
    }

    fn q(id: &str, difficulty: Difficulty) -> QuestionItem {
        QuestionItem::new(id, "addition", difficulty)
    }

    fn ids<'a>(items: &[&'a QuestionItem]) -> Vec<&'a str> {
        items.iter().copied().filter_map(|q| q.id()).collect()
    }
}
