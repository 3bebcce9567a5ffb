/**
 * Outcome histories: for every topic, and for every area within a topic, the list of
 * whether each recent answer was correct, oldest first.
 */
use tracing::debug;

use super::persistence::{load_json_or_default, save_json, Store};
use super::quiz::{normalize_area, QuestionItem};


/// The maximum number of outcomes kept per history. Older outcomes are dropped first.
pub const HISTORY_CAP: usize = 200;


/// Key of the history of a whole topic.
pub fn topic_key(topic: &str) -> String {
    format!("hist_{}", topic)
}


/// Key of the history of one area within a topic.
pub fn area_key(topic: &str, area: &str) -> String {
    format!("hist_{}_{}", topic, normalize_area(area))
}


/// Load the history stored under `key`. Missing or malformed data is an empty history.
pub fn load_history(store: &dyn Store, key: &str) -> Vec<bool> {
    load_json_or_default(store, key)
}


pub fn topic_history(store: &dyn Store, topic: &str) -> Vec<bool> {
    load_history(store, &topic_key(topic))
}


pub fn area_history(store: &dyn Store, topic: &str, area: &str) -> Vec<bool> {
    load_history(store, &area_key(topic, area))
}


/// Append `correct` to the history under `key`, evicting the oldest entries beyond
/// `HISTORY_CAP`.
pub fn append_outcome(store: &mut dyn Store, key: &str, correct: bool) {
    let mut history = load_history(store, key);
    history.push(correct);
    if history.len() > HISTORY_CAP {
        let excess = history.len() - HISTORY_CAP;
        history.drain(..excess);
    }
    save_json(store, key, &history);
}


/// Record the outcome of answering `item` under both the topic history and the history
/// of the item's area.
pub fn record_outcome(store: &mut dyn Store, topic: &str, item: &QuestionItem, correct: bool) {
    let area = item.area();
    debug!(topic, area = area.as_str(), id = ?item.id(), correct, "recording outcome");
    append_outcome(store, &area_key(topic, &area), correct);
    append_outcome(store, &topic_key(topic), correct);
}


/// Forget the topic history and the histories of `areas`.
pub fn reset_history(store: &mut dyn Store, topic: &str, areas: &[String]) {
    for area in areas.iter() {
        store.remove(&area_key(topic, area));
    }
    store.remove(&topic_key(topic));
}
