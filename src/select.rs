/**
 * The full selection pipeline for one session: work out the difficulty from the
 * learner's recent accuracy, narrow the bank to that difficulty, weight the areas by
 * weakness and draw.
 */
use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::Settings;
use super::difficulty::{decide_difficulty, filter_by_difficulty, rolling_accuracy, Thresholds};
use super::history::{record_outcome, topic_history};
use super::persistence::Store;
use super::quiz::{distinct_areas, Difficulty, QuestionItem};
use super::random::Randomness;
use super::repetition::{draw_smart, draw_weighted_with_policy, ExhaustionPolicy};
use super::weights::{weakness_weights, WeightMap};


/// The kind of session. Each kind keeps its own record of served questions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Uniform draw without repeats.
    Practice,
    /// Draw weighted towards weak areas.
    Exam,
    /// A short daily draw weighted towards weak areas.
    Daily,
}


impl SessionMode {
    pub const ALL: [SessionMode; 3] = [SessionMode::Practice, SessionMode::Exam, SessionMode::Daily];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Practice => "practice",
            SessionMode::Exam => "exam",
            SessionMode::Daily => "daily",
        }
    }

    /// The context key under which served questions are recorded for `topic`.
    pub fn context_key(self, topic: &str) -> String {
        format!("{}_{}", self.as_str(), topic)
    }

    pub fn is_weighted(self) -> bool {
        self != SessionMode::Practice
    }

    /// The configured number of questions for this kind of session.
    pub fn default_count(self, settings: &Settings) -> usize {
        match self {
            SessionMode::Practice => settings.per_quiz,
            SessionMode::Exam => settings.per_exam,
            SessionMode::Daily => settings.per_daily,
        }
    }
}


impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub topic: String,
    pub mode: SessionMode,
    pub count: usize,
    pub base: Difficulty,
    pub adaptive: bool,
    pub no_repeat: bool,
    pub accuracy_window: usize,
    pub weakness_window: usize,
    pub thresholds: Thresholds,
    pub exhaustion_policy: ExhaustionPolicy,
}


impl SelectionRequest {
    /// A request for a `mode` session on `topic` as configured in `settings`.
    pub fn from_settings(topic: &str, mode: SessionMode, settings: &Settings) -> Self {
        let (base, adaptive) = settings.difficulty.resolve();
        SelectionRequest {
            topic: topic.to_string(),
            mode,
            count: mode.default_count(settings),
            base,
            adaptive,
            no_repeat: settings.no_repeats,
            accuracy_window: settings.accuracy_window,
            weakness_window: settings.weakness_window,
            thresholds: settings.thresholds(),
            exhaustion_policy: settings.exhaustion_policy,
        }
    }
}


/// The result of a selection.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// The difficulty drawn from.
    pub tier: Difficulty,
    /// The area weights used, if the draw was weighted.
    pub weights: Option<WeightMap>,
    pub items: Vec<&'a QuestionItem>,
}


/// The difficulty to draw from for `request`, given the topic's recent accuracy.
pub fn target_tier(store: &dyn Store, request: &SelectionRequest) -> Difficulty {
    let accuracy = rolling_accuracy(&topic_history(store, &request.topic), request.accuracy_window);
    decide_difficulty(request.base, request.adaptive, accuracy, request.thresholds)
}


/// Choose the questions for a session from `pool`.
pub fn select<'a, R: Randomness>(
    store: &mut dyn Store,
    rng: &mut R,
    pool: &'a [QuestionItem],
    request: &SelectionRequest,
) -> Selection<'a> {
    let tier = target_tier(store, request);
    let candidates = filter_by_difficulty(pool, tier);
    let context = request.mode.context_key(&request.topic);

    if request.mode.is_weighted() {
        let areas = distinct_areas(&candidates);
        let weights = weakness_weights(store, &request.topic, &areas, request.weakness_window);
        let items = draw_weighted_with_policy(
            store,
            rng,
            &candidates,
            request.count,
            Some(&weights),
            &context,
            request.no_repeat,
            request.exhaustion_policy,
        );
        Selection { tier, weights: Some(weights), items }
    } else {
        let items = draw_smart(store, rng, &candidates, request.count, &context, request.no_repeat);
        Selection { tier, weights: None, items }
    }
}


/// Record the outcomes of a finished session.
pub fn record_session_outcomes(store: &mut dyn Store, topic: &str, outcomes: &[(&QuestionItem, bool)]) {
    for &(item, correct) in outcomes.iter() {
        record_outcome(store, topic, item, correct);
    }
}


#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::history::{append_outcome, area_key, topic_key};
    use crate::persistence::MemoryStore;
    use crate::repetition::load_used;

    #[test]
    fn context_keys_are_namespaced_by_mode() {
        assert_eq!(SessionMode::Practice.context_key("matematik"), "practice_matematik");
        assert_eq!(SessionMode::Exam.context_key("matematik"), "exam_matematik");
        assert_eq!(SessionMode::Daily.context_key("svenska"), "daily_svenska");
    }

    #[test]
    fn practice_draws_from_target_tier() {
        let pool = mixed_pool();
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(11);
        let request = request(SessionMode::Practice, 3, false);

        let selection = select(&mut store, &mut rng, &pool, &request);
        assert_eq!(selection.tier, Difficulty::Standard);
        assert_eq!(selection.items.len(), 3);
        assert!(selection.items.iter().all(|q| q.difficulty == Difficulty::Standard));
        assert!(selection.weights.is_none());
        assert_eq!(load_used(&store, "practice_matematik").len(), 3);
    }

    #[test]
    fn adaptive_request_follows_accuracy() {
        let pool = mixed_pool();
        let mut store = MemoryStore::new();
        for _ in 0..10 {
            append_outcome(&mut store, &topic_key("matematik"), false);
        }
        let mut rng = StdRng::seed_from_u64(12);
        let request = request(SessionMode::Practice, 2, true);

        let selection = select(&mut store, &mut rng, &pool, &request);
        assert_eq!(selection.tier, Difficulty::Easy);
        assert!(selection.items.iter().all(|q| q.difficulty == Difficulty::Easy));
    }

    #[test]
    fn exam_weights_weak_areas() {
        let mut pool = Vec::new();
        for i in 0..10 {
            pool.push(QuestionItem::new(&format!("a{}", i), "addition", Difficulty::Standard));
            pool.push(QuestionItem::new(&format!("d{}", i), "division", Difficulty::Standard));
        }
        let mut store = MemoryStore::new();
        for _ in 0..10 {
            append_outcome(&mut store, &area_key("matematik", "division"), false);
            append_outcome(&mut store, &area_key("matematik", "addition"), true);
        }
        let mut rng = StdRng::seed_from_u64(13);
        let request = request(SessionMode::Exam, 10, false);

        let selection = select(&mut store, &mut rng, &pool, &request);
        let weights = selection.weights.unwrap();
        assert!(weights["division"] > weights["addition"]);
        let division = selection.items.iter().filter(|q| q.area() == "division").count();
        assert!(division > 5);
        assert_eq!(selection.items.len(), 10);
    }

    #[test]
    fn outcomes_feed_back_into_history() {
        let pool = mixed_pool();
        let mut store = MemoryStore::new();
        record_session_outcomes(&mut store, "matematik", &[(&pool[0], true), (&pool[1], false)]);
        assert_eq!(topic_history(&store, "matematik"), vec![true, false]);
    }

    #[test]
    fn request_from_settings_uses_mode_count() {
        let settings = Settings::default();
        let request = SelectionRequest::from_settings("svenska", SessionMode::Daily, &settings);
        assert_eq!(request.count, 6);
        assert!(!request.adaptive);
        assert!(request.no_repeat);
    }

    fn mixed_pool() -> Vec<QuestionItem> {
        let mut pool = Vec::new();
        for i in 0..5 {
            pool.push(QuestionItem::new(&format!("e{}", i), "addition", Difficulty::Easy));
            pool.push(QuestionItem::new(&format!("s{}", i), "addition", Difficulty::Standard));
        }
        pool
    }

    fn request(mode: SessionMode, count: usize, adaptive: bool) -> SelectionRequest {
        SelectionRequest {
            topic: String::from("matematik"),
            mode,
            count,
            base: Difficulty::Standard,
            adaptive,
            no_repeat: true,
            accuracy_window: 10,
            weakness_window: 50,
            thresholds: Thresholds::default(),
            exhaustion_policy: ExhaustionPolicy::Reuse,
        }
    }
}
