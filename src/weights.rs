/**
 * Weakness weights: how strongly each area of a topic should be represented in the
 * next draw. Areas the learner answers poorly get more questions.
 */
use std::collections::HashMap;

use super::difficulty::rolling_accuracy;
use super::history::area_history;
use super::persistence::Store;
use super::quiz::normalize_area;


/// Maps an area to its weight. Recomputed for every draw and never stored.
pub type WeightMap = HashMap<String, f64>;

pub const MIN_WEIGHT: f64 = 0.5;
pub const MAX_WEIGHT: f64 = 2.0;
/// Weights at or below this are raised to it so that no area has a zero share.
pub const WEIGHT_EPSILON: f64 = 1e-6;
/// How strongly accuracy below 50% raises the weight, and accuracy above lowers it.
const SLOPE: f64 = 1.2;


/// The weight of an area given its accuracy. An area without data gets weight 1, as
/// does an area at exactly 50%.
pub fn raw_weight(accuracy: Option<f64>) -> f64 {
    match accuracy {
        Some(accuracy) => (1.0 + (0.5 - accuracy) * SLOPE).max(MIN_WEIGHT).min(MAX_WEIGHT),
        None => 1.0,
    }
}


/// Floor `weight` at `WEIGHT_EPSILON`. Not-a-number counts as zero.
pub fn floor_weight(weight: f64) -> f64 {
    if weight > WEIGHT_EPSILON {
        weight
    } else {
        WEIGHT_EPSILON
    }
}


/// Compute the weight of every area in `areas` from the last `window` outcomes of each
/// area, scaled so that the mean weight is 1.
pub fn weakness_weights(store: &dyn Store, topic: &str, areas: &[String], window: usize) -> WeightMap {
    let mut weights = WeightMap::new();
    for area in areas.iter() {
        let area = normalize_area(area);
        if weights.contains_key(&area) {
            continue;
        }
        let accuracy = rolling_accuracy(&area_history(store, topic, &area), window);
        weights.insert(area, raw_weight(accuracy));
    }

    if weights.is_empty() {
        return weights;
    }
    let mean = weights.values().sum::<f64>() / weights.len() as f64;
    let mean = floor_weight(mean);
    for weight in weights.values_mut() {
        *weight = floor_weight(*weight / mean);
    }
    weights
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::append_outcome;
    use crate::history::area_key;
    use crate::persistence::MemoryStore;

    #[test]
    fn raw_weights_follow_accuracy() {
        assert_eq!(raw_weight(None), 1.0);
        assert_eq!(raw_weight(Some(0.5)), 1.0);
        assert!((raw_weight(Some(0.3)) - 1.24).abs() < 1e-9);
        assert!((raw_weight(Some(1.0)) - 0.5).abs() < 1e-9);
        assert!((raw_weight(Some(0.0)) - 1.6).abs() < 1e-9);
    }

    #[test]
    fn weights_are_clamped() {
        assert_eq!(raw_weight(Some(-5.0)), MAX_WEIGHT);
        assert_eq!(raw_weight(Some(5.0)), MIN_WEIGHT);
    }

    #[test]
    fn weak_area_outweighs_area_without_data() {
        let mut store = MemoryStore::new();
        // 3 of 10 correct.
        for i in 0..10 {
            append_outcome(&mut store, &area_key("matematik", "addition"), i < 3);
        }
        let areas = vec![String::from("addition"), String::from("division")];
        let weights = weakness_weights(&store, "matematik", &areas, 50);

        let mean = (1.24 + 1.0) / 2.0;
        assert!((weights["addition"] - 1.24 / mean).abs() < 1e-9);
        assert!((weights["division"] - 1.0 / mean).abs() < 1e-9);
        assert!(weights["addition"] > weights["division"]);
    }

    #[test]
    fn weights_average_to_one() {
        let mut store = MemoryStore::new();
        for ok in [true, true, false, true].iter() {
            append_outcome(&mut store, &area_key("svenska", "stavning"), *ok);
        }
        append_outcome(&mut store, &area_key("svenska", "grammatik"), false);
        let areas = vec![
            String::from("stavning"),
            String::from("Grammatik"),
            String::from("reading"),
        ];
        let weights = weakness_weights(&store, "svenska", &areas, 50);
        assert_eq!(weights.len(), 3);
        assert!(weights.contains_key("grammatik"));
        let mean = weights.values().sum::<f64>() / 3.0;
        assert!((mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_areas_means_no_weights() {
        let store = MemoryStore::new();
        assert!(weakness_weights(&store, "svenska", &[], 50).is_empty());
    }

    #[test]
    fn floor_weight_handles_zero_and_nan() {
        assert_eq!(floor_weight(0.0), WEIGHT_EPSILON);
        assert_eq!(floor_weight(-1.0), WEIGHT_EPSILON);
        assert_eq!(floor_weight(f64::NAN), WEIGHT_EPSILON);
        assert_eq!(floor_weight(0.7), 0.7);
    }
}
