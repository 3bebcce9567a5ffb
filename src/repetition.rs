/**
 * Choose which questions to ask next.
 *
 * Two samplers avoid repeating questions across sessions by remembering, per context
 * key, the ids already served:
 *
 *   - The no-repeat sampler draws uniformly from the questions not yet served. When
 *     fewer remain than requested it takes all of them, tops up from the whole pool and
 *     starts a new cycle by forgetting everything served so far.
 *   - The weighted sampler splits the requested count between areas in proportion to
 *     their weights, then fills any shortfall from the rest of the pool. By default it
 *     never forgets served questions: once everything has been served it simply allows
 *     repeats. `ExhaustionPolicy::Rollover` makes it start a new cycle instead, like the
 *     no-repeat sampler.
 *
 * Neither sampler fails. At worst a draw repeats questions or ignores the weights, and a
 * draw only returns fewer questions than requested when the pool itself is smaller.
 */
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::persistence::{load_json_or_default, save_json, Store};
use super::quiz::{normalize_area, QuestionItem};
use super::random::Randomness;
use super::weights::{floor_weight, WeightMap};


/// Allows for floating-point error when splitting a count by weight, so that a 2:1
/// split of 9 is exactly 6 and 3.
const QUOTA_TOLERANCE: f64 = 1e-9;


/// What the weighted sampler does once every question has been served.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Keep the registry and allow served questions to be asked again.
    Reuse,
    /// Clear the registry and start a new cycle.
    Rollover,
}


impl Default for ExhaustionPolicy {
    fn default() -> Self {
        ExhaustionPolicy::Reuse
    }
}


/// Key of the registry of ids served under `context`.
pub fn used_key(context: &str) -> String {
    format!("{}__usedIds", context)
}


/// Load the ids served under `context`. Missing or malformed data is an empty registry.
pub fn load_used(store: &dyn Store, context: &str) -> BTreeSet<String> {
    let ids: Vec<String> = load_json_or_default(store, &used_key(context));
    ids.into_iter().collect()
}


fn save_used(store: &mut dyn Store, context: &str, used: &BTreeSet<String>) {
    save_json(store, &used_key(context), used);
}


/// Forget the ids served under `context`.
pub fn clear_used(store: &mut dyn Store, context: &str) {
    store.remove(&used_key(context));
}


/// Forget the ids served under each of `contexts`.
pub fn clear_used_many<S: AsRef<str>>(store: &mut dyn Store, contexts: &[S]) {
    for context in contexts.iter() {
        clear_used(store, context.as_ref());
    }
}


fn id_of<T: Borrow<QuestionItem>>(pool: &[T], i: usize) -> Option<&str> {
    pool[i].borrow().id()
}


fn collect<T: Clone>(pool: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| pool[i].clone()).collect()
}


/// Draw `count` questions from `pool`, avoiding any served under `context` since the
/// start of the current cycle. Questions without an id are only used as a last resort.
pub fn draw_without_replacement<T, R>(
    store: &mut dyn Store,
    rng: &mut R,
    pool: &[T],
    count: usize,
    context: &str,
) -> Vec<T>
where
    T: Borrow<QuestionItem> + Clone,
    R: Randomness,
{
    if count == 0 || pool.is_empty() {
        return Vec::new();
    }

    let mut used = load_used(store, context);
    let mut available: Vec<usize> = (0..pool.len())
        .filter(|&i| id_of(pool, i).map_or(false, |id| !used.contains(id)))
        .collect();

    let picked = if available.len() >= count {
        rng.shuffle(&mut available);
        available.truncate(count);
        available
    } else {
        debug!(context, remaining = available.len(), count, "cycle exhausted, starting a new one");
        let mut picked = available;
        let mut picked_ids: HashSet<String> = picked
            .iter()
            .filter_map(|&i| id_of(pool, i).map(String::from))
            .collect();

        let mut order: Vec<usize> = (0..pool.len()).collect();
        rng.shuffle(&mut order);
        for &i in order.iter() {
            if picked.len() >= count {
                break;
            }
            if let Some(id) = id_of(pool, i) {
                if picked_ids.insert(id.to_string()) {
                    picked.push(i);
                }
            }
        }
        for &i in order.iter() {
            if picked.len() >= count {
                break;
            }
            if id_of(pool, i).is_none() {
                picked.push(i);
            }
        }

        used.clear();
        rng.shuffle(&mut picked);
        picked
    };

    for &i in picked.iter() {
        if let Some(id) = id_of(pool, i) {
            used.insert(id.to_string());
        }
    }
    save_used(store, context, &used);
    collect(pool, &picked)
}


/// Draw up to `count` questions uniformly at random, independently of earlier draws.
pub fn draw_with_replacement<T, R>(rng: &mut R, pool: &[T], count: usize) -> Vec<T>
where
    T: Clone,
    R: Randomness,
{
    let mut order: Vec<usize> = (0..pool.len()).collect();
    rng.shuffle(&mut order);
    order.truncate(count);
    collect(pool, &order)
}


/// Draw with `draw_without_replacement` if `no_repeat` is set, otherwise with
/// `draw_with_replacement`.
pub fn draw_smart<T, R>(
    store: &mut dyn Store,
    rng: &mut R,
    pool: &[T],
    count: usize,
    context: &str,
    no_repeat: bool,
) -> Vec<T>
where
    T: Borrow<QuestionItem> + Clone,
    R: Randomness,
{
    if no_repeat {
        draw_without_replacement(store, rng, pool, count, context)
    } else {
        draw_with_replacement(rng, pool, count)
    }
}


/// Split `count` between groups in proportion to `weights`. Each group gets the floor of
/// its share and the remainder goes to the group with the highest weight (the first one
/// on ties). Weights are floored at a small positive epsilon.
pub fn allocate_quotas(weights: &[f64], count: usize) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weights: Vec<f64> = weights.iter().map(|&w| floor_weight(w)).collect();
    let total: f64 = weights.iter().sum();
    let mut quotas: Vec<usize> = weights
        .iter()
        .map(|&w| (w * count as f64 / total + QUOTA_TOLERANCE).floor() as usize)
        .collect();

    let mut top = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w > weights[top] {
            top = i;
        }
    }
    let assigned: usize = quotas.iter().sum();
    quotas[top] += count.saturating_sub(assigned);
    quotas
}


/// Group the indices of `pool` by area, in order of each area's first appearance.
fn group_by_area<T: Borrow<QuestionItem>>(pool: &[T]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, item) in pool.iter().enumerate() {
        let area = item.borrow().area();
        match groups.iter_mut().find(|(a, _)| *a == area) {
            Some((_, members)) => members.push(i),
            None => groups.push((area, vec![i])),
        }
    }
    groups
}


/// Draw `count` questions with per-area quotas derived from `weights` (uniform if
/// `None`; areas missing from the map get weight 1). Served questions are avoided under
/// `context` when `no_repeat` is set, and repeated only once nothing else is left.
pub fn draw_weighted<T, R>(
    store: &mut dyn Store,
    rng: &mut R,
    pool: &[T],
    count: usize,
    weights: Option<&WeightMap>,
    context: &str,
    no_repeat: bool,
) -> Vec<T>
where
    T: Borrow<QuestionItem> + Clone,
    R: Randomness,
{
    draw_weighted_with_policy(
        store, rng, pool, count, weights, context, no_repeat, ExhaustionPolicy::Reuse)
}


/// Like `draw_weighted`, choosing what happens when served questions must be repeated.
#[allow(clippy::too_many_arguments)]
pub fn draw_weighted_with_policy<T, R>(
    store: &mut dyn Store,
    rng: &mut R,
    pool: &[T],
    count: usize,
    weights: Option<&WeightMap>,
    context: &str,
    no_repeat: bool,
    policy: ExhaustionPolicy,
) -> Vec<T>
where
    T: Borrow<QuestionItem> + Clone,
    R: Randomness,
{
    if count == 0 || pool.is_empty() {
        return Vec::new();
    }

    let mut used = if no_repeat { load_used(store, context) } else { BTreeSet::new() };
    let weights: HashMap<String, f64> = weights
        .map(|w| w.iter().map(|(area, &weight)| (normalize_area(area), weight)).collect())
        .unwrap_or_default();

    let groups = group_by_area(pool);
    let group_weights: Vec<f64> = groups
        .iter()
        .map(|(area, _)| weights.get(area).copied().unwrap_or(1.0))
        .collect();
    let quotas = allocate_quotas(&group_weights, count);

    let mut selected: Vec<usize> = Vec::new();
    let mut taken = vec![false; pool.len()];
    {
        let is_used = |i: usize| id_of(pool, i).map_or(false, |id| used.contains(id));

        for ((_, members), &quota) in groups.iter().zip(quotas.iter()) {
            let mut candidates: Vec<usize> =
                members.iter().copied().filter(|&i| !is_used(i)).collect();
            rng.shuffle(&mut candidates);
            for i in candidates.into_iter().take(quota) {
                taken[i] = true;
                selected.push(i);
            }
        }

        if selected.len() < count {
            debug!(context, selected = selected.len(), count, "areas short of questions, filling from the pool");
            let mut candidates: Vec<usize> =
                (0..pool.len()).filter(|&i| !taken[i] && !is_used(i)).collect();
            rng.shuffle(&mut candidates);
            for i in candidates.into_iter().take(count - selected.len()) {
                taken[i] = true;
                selected.push(i);
            }
        }
    }

    if selected.len() < count && selected.len() < pool.len() {
        if no_repeat && policy == ExhaustionPolicy::Rollover {
            debug!(context, "every question served, starting a new cycle");
            used.clear();
        } else {
            debug!(context, "every question served, allowing repeats");
        }
        let mut candidates: Vec<usize> = (0..pool.len()).filter(|&i| !taken[i]).collect();
        rng.shuffle(&mut candidates);
        for i in candidates.into_iter().take(count - selected.len()) {
            taken[i] = true;
            selected.push(i);
        }
    }

    if no_repeat {
        for &i in selected.iter() {
            if let Some(id) = id_of(pool, i) {
                used.insert(id.to_string());
            }
        }
        save_used(store, context, &used);
    }

    rng.shuffle(&mut selected);
    collect(pool, &selected)
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::persistence::MemoryStore;
    use crate::quiz::Difficulty;
    use crate::random::testing::Identity;

    #[test]
    fn draws_distinct_unserved_questions() {
        let pool = make_pool("q", "addition", 10);
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        let first = draw_without_replacement(&mut store, &mut rng, &pool, 4, "practice_math");
        let second = draw_without_replacement(&mut store, &mut rng, &pool, 4, "practice_math");
        assert_eq!(distinct_ids(&first).len(), 4);
        assert_eq!(distinct_ids(&second).len(), 4);
        assert!(distinct_ids(&first).is_disjoint(&distinct_ids(&second)));
        assert_eq!(load_used(&store, "practice_math").len(), 8);
    }

    #[test]
    fn exhausted_cycle_rolls_over() {
        let pool = make_pool("q", "addition", 5);
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(2);

        let first = draw_without_replacement(&mut store, &mut rng, &pool, 4, "ctx");
        let remaining: HashSet<String> = pool
            .iter()
            .filter_map(|q| q.id.clone())
            .filter(|id| !distinct_ids(&first).contains(id))
            .collect();
        assert_eq!(remaining.len(), 1);

        let second = draw_without_replacement(&mut store, &mut rng, &pool, 4, "ctx");
        let second_ids = distinct_ids(&second);
        assert_eq!(second_ids.len(), 4);
        assert!(remaining.is_subset(&second_ids));
        // The registry was cleared, then this draw was recorded.
        assert_eq!(load_used(&store, "ctx").into_iter().collect::<HashSet<_>>(), second_ids);
    }

    #[test]
    fn small_pool_gives_short_draw_without_duplicates() {
        let pool = make_pool("q", "addition", 3);
        let mut store = MemoryStore::new();
        let drawn = draw_without_replacement(&mut store, &mut Identity, &pool, 5, "ctx");
        assert_eq!(drawn.len(), 3);
        assert_eq!(distinct_ids(&drawn).len(), 3);
    }

    #[test]
    fn questions_without_ids_are_last_resort() {
        let mut pool = make_pool("q", "addition", 2);
        let mut anonymous = QuestionItem::new("x", "addition", Difficulty::Standard);
        anonymous.id = None;
        pool.push(anonymous);
        let mut store = MemoryStore::new();

        let drawn = draw_without_replacement(&mut store, &mut Identity, &pool, 2, "ctx");
        assert!(drawn.iter().all(|q| q.id.is_some()));

        let drawn = draw_without_replacement(&mut store, &mut Identity, &pool, 3, "ctx");
        assert_eq!(drawn.len(), 3);
        assert_eq!(drawn.iter().filter(|q| q.id.is_none()).count(), 1);
    }

    #[test]
    fn zero_count_and_empty_pool_draw_nothing() {
        let pool = make_pool("q", "addition", 3);
        let empty: Vec<QuestionItem> = Vec::new();
        let mut store = MemoryStore::new();
        assert!(draw_without_replacement(&mut store, &mut Identity, &pool, 0, "ctx").is_empty());
        assert!(draw_without_replacement(&mut store, &mut Identity, &empty, 3, "ctx").is_empty());
        assert!(draw_weighted(&mut store, &mut Identity, &pool, 0, None, "ctx", true).is_empty());
        assert!(draw_weighted(&mut store, &mut Identity, &empty, 3, None, "ctx", true).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_registry_is_treated_as_empty() {
        let pool = make_pool("q", "addition", 3);
        let mut store = MemoryStore::new();
        store.set("ctx__usedIds", "{oops");
        let drawn = draw_without_replacement(&mut store, &mut Identity, &pool, 3, "ctx");
        assert_eq!(drawn.len(), 3);
        assert_eq!(load_used(&store, "ctx").len(), 3);
    }

    #[test]
    fn contexts_are_isolated() {
        let pool = make_pool("q", "addition", 4);
        let mut store = MemoryStore::new();
        draw_without_replacement(&mut store, &mut Identity, &pool, 4, "practice_math");
        assert!(load_used(&store, "exam_math").is_empty());

        clear_used_many(&mut store, &["practice_math", "exam_math"]);
        assert!(load_used(&store, "practice_math").is_empty());
    }

    #[test]
    fn draw_smart_without_no_repeat_touches_nothing() {
        let pool = make_pool("q", "addition", 4);
        let mut store = MemoryStore::new();
        let drawn = draw_smart(&mut store, &mut Identity, &pool, 2, "ctx", false);
        assert_eq!(drawn.len(), 2);
        assert!(store.is_empty());

        let drawn = draw_smart(&mut store, &mut Identity, &pool, 2, "ctx", true);
        assert_eq!(drawn.len(), 2);
        assert_eq!(load_used(&store, "ctx").len(), 2);
    }

    #[test]
    fn quotas_follow_weights() {
        assert_eq!(allocate_quotas(&[2.0, 1.0], 9), vec![6, 3]);
        assert_eq!(allocate_quotas(&[4.0 / 3.0, 2.0 / 3.0], 9), vec![6, 3]);
        assert_eq!(allocate_quotas(&[1.0, 1.0, 1.0], 10), vec![4, 3, 3]);
        assert_eq!(allocate_quotas(&[1.0, 3.0], 3), vec![0, 3]);
        assert_eq!(allocate_quotas(&[0.0, 0.0], 4), vec![2, 2]);
        assert!(allocate_quotas(&[], 4).is_empty());
    }

    #[test]
    fn weighted_draw_honours_quotas() {
        let mut pool = make_pool("a", "addition", 9);
        pool.extend(make_pool("d", "division", 9));
        let mut weights = WeightMap::new();
        weights.insert(String::from("addition"), 2.0);
        weights.insert(String::from("division"), 1.0);
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(3);

        let drawn = draw_weighted(&mut store, &mut rng, &pool, 9, Some(&weights), "daily_math", true);
        assert_eq!(drawn.len(), 9);
        assert_eq!(count_area(&drawn, "addition"), 6);
        assert_eq!(count_area(&drawn, "division"), 3);
        assert_eq!(load_used(&store, "daily_math").len(), 9);
    }

    #[test]
    fn weighted_draw_without_weights_is_uniform_across_areas() {
        let mut pool = make_pool("a", "Addition", 5);
        pool.extend(make_pool("d", "division", 5));
        let mut store = MemoryStore::new();
        let drawn = draw_weighted(&mut store, &mut Identity, &pool, 4, None, "ctx", false);
        assert_eq!(count_area(&drawn, "addition"), 2);
        assert_eq!(count_area(&drawn, "division"), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn weighted_draw_fills_shortfall_from_other_areas() {
        let mut pool = make_pool("a", "addition", 1);
        pool.extend(make_pool("d", "division", 6));
        let mut weights = WeightMap::new();
        weights.insert(String::from("addition"), 2.0);
        let mut store = MemoryStore::new();

        let drawn = draw_weighted(&mut store, &mut Identity, &pool, 5, Some(&weights), "ctx", true);
        assert_eq!(drawn.len(), 5);
        assert_eq!(distinct_ids(&drawn).len(), 5);
        assert_eq!(count_area(&drawn, "addition"), 1);
    }

    #[test]
    fn weighted_draw_reuses_without_clearing_registry() {
        let pool = make_pool("a", "addition", 5);
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(4);

        let first = draw_weighted(&mut store, &mut rng, &pool, 4, None, "ctx", true);
        let second = draw_weighted(&mut store, &mut rng, &pool, 4, None, "ctx", true);
        assert_eq!(distinct_ids(&second).len(), 4);
        // The one unserved question comes first, then repeats.
        let unserved: Vec<String> = pool
            .iter()
            .filter_map(|q| q.id.clone())
            .filter(|id| !distinct_ids(&first).contains(id))
            .collect();
        assert!(distinct_ids(&second).contains(&unserved[0]));
        assert_eq!(load_used(&store, "ctx").len(), 5);
    }

    #[test]
    fn weighted_draw_can_roll_over() {
        let pool = make_pool("a", "addition", 5);
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(5);

        draw_weighted_with_policy(
            &mut store, &mut rng, &pool, 4, None, "ctx", true, ExhaustionPolicy::Rollover);
        let second = draw_weighted_with_policy(
            &mut store, &mut rng, &pool, 4, None, "ctx", true, ExhaustionPolicy::Rollover);
        assert_eq!(
            load_used(&store, "ctx").into_iter().collect::<HashSet<_>>(),
            distinct_ids(&second),
        );
    }

    #[test]
    fn weighted_draw_never_duplicates_within_a_call() {
        let pool = make_pool("a", "addition", 3);
        let mut store = MemoryStore::new();
        let drawn = draw_weighted(&mut store, &mut Identity, &pool, 10, None, "ctx", true);
        assert_eq!(drawn.len(), 3);
        assert_eq!(distinct_ids(&drawn).len(), 3);
    }

    #[test]
    fn weighted_draw_uses_but_never_records_questions_without_ids() {
        let mut pool = make_pool("a", "addition", 3);
        for _ in 0..2 {
            let mut anonymous = QuestionItem::new("x", "addition", Difficulty::Standard);
            anonymous.id = None;
            pool.push(anonymous);
        }
        let known: HashSet<String> = distinct_ids(&pool);
        let mut store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(8);

        for _ in 0..4 {
            let drawn = draw_weighted(&mut store, &mut rng, &pool, 4, None, "ctx", true);
            assert_eq!(drawn.len(), 4);
            let used = load_used(&store, "ctx");
            assert!(!used.is_empty());
            assert!(used.iter().all(|id| known.contains(id)));
        }
    }

    #[test]
    fn samplers_accept_borrowed_pools() {
        let pool = make_pool("a", "addition", 4);
        let borrowed: Vec<&QuestionItem> = pool.iter().collect();
        let mut store = MemoryStore::new();
        let drawn: Vec<&QuestionItem> =
            draw_weighted(&mut store, &mut Identity, &borrowed, 2, None, "ctx", true);
        assert_eq!(drawn.len(), 2);
    }

    fn make_pool(prefix: &str, area: &str, n: usize) -> Vec<QuestionItem> {
        (0..n)
            .map(|i| QuestionItem::new(&format!("{}{}", prefix, i), area, Difficulty::Standard))
            .collect()
    }

    fn distinct_ids(items: &[QuestionItem]) -> HashSet<String> {
        items.iter().filter_map(|q| q.id.clone()).collect()
    }

    fn count_area(items: &[QuestionItem], area: &str) -> usize {
        items.iter().filter(|q| q.area() == area).count()
    }
}
