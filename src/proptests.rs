use super::*;

use std::collections::HashMap;

use proptest::prelude::*;
use proptest::sample::Index as Pick;
use proptest_derive::Arbitrary;

use crate::arena::Link;

/// Check every structural invariant of `t` by walking each level.
fn validate_index<R>(t: &RankIndex<R>) {
    let arena = &t.arena;

    // Level 0: order, back links, tail, length, per-node heights.
    let mut position: HashMap<Link, usize> = HashMap::new();
    let mut prev = Link::NIL;
    let mut x = arena[Link::HEADER].forward(0);
    let mut max_height = 1usize;
    while !x.is_nil() {
        assert!(!position.contains_key(&x), "level-0 cycle");
        let node = &arena[x];
        assert_eq!(node.backward, prev, "backward link mismatch");
        if !prev.is_nil() {
            let p = &arena[prev];
            assert!(
                p.precedes(node.score, node.id) || p.matches(node.score, node.id),
                "order violated: ({}, {}) before ({}, {})",
                p.score,
                p.id,
                node.score,
                node.id
            );
        }
        for (i, l) in node.levels.iter().enumerate() {
            assert_ne!(l.forward, x, "self link at level {i}");
        }
        max_height = max_height.max(node.height());
        position.insert(x, position.len() + 1);
        prev = x;
        x = node.forward(0);
    }
    assert_eq!(position.len(), t.length, "reachable entries must match len()");
    assert_eq!(t.tail, prev, "tail must be the last level-0 entry");
    assert_eq!(t.tail.is_nil(), t.length == 0);
    assert_eq!(t.level, max_height, "level must be the tallest entry");

    let header = &arena[Link::HEADER];
    for i in t.level..MAX_LEVEL {
        assert!(header.forward(i).is_nil(), "inactive header level {i} is linked");
    }

    // Every active level: membership and spans.
    for i in 0..t.level {
        let mut x = Link::HEADER;
        let mut pos = 0usize;
        let mut members = 0usize;
        loop {
            let l = arena[x].levels[i];
            if l.forward.is_nil() {
                assert_eq!(l.span, t.length - pos, "tail span at level {i}");
                break;
            }
            let next_pos = position[&l.forward];
            assert_eq!(pos + l.span, next_pos, "span mismatch at level {i}");
            assert!(arena[l.forward].height() > i);
            members += 1;
            pos = next_pos;
            x = l.forward;
        }
        let expected = position.keys().filter(|&&n| arena[n].height() > i).count();
        assert_eq!(members, expected, "level {i} skips a member");
    }
}

/// Sorted `(score, id)` model; equal keys are interchangeable.
#[derive(Default)]
struct Model(Vec<(f64, i64)>);

impl Model {
    fn slot(&self, score: f64, id: i64) -> usize {
        self.0
            .partition_point(|&(s, i)| s < score || (s == score && i < id))
    }

    fn insert(&mut self, score: f64, id: i64) {
        let at = self.slot(score, id);
        self.0.insert(at, (score, id));
    }

    fn delete(&mut self, score: f64, id: i64) -> bool {
        let at = self.slot(score, id);
        if self.0.get(at) == Some(&(score, id)) {
            self.0.remove(at);
            true
        } else {
            false
        }
    }

    fn range(&self, min: f64, max: f64) -> Vec<Entry> {
        self.0
            .iter()
            .filter(|&&(s, _)| s >= min && s <= max)
            .map(|&(s, i)| Entry::new(i, s))
            .collect()
    }

    fn entries(&self) -> Vec<Entry> {
        self.0.iter().map(|&(s, i)| Entry::new(i, s)).collect()
    }
}

fn score() -> impl Strategy<Value = f64> {
    // Few distinct scores so ties on score are common.
    (0u8..24).prop_map(|v| f64::from(v) * 0.5)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 6)]
    Insert(
        #[proptest(strategy = "score()")] f64,
        #[proptest(strategy = "0i64..16")] i64,
    ),
    #[proptest(weight = 2)]
    Delete(
        #[proptest(strategy = "score()")] f64,
        #[proptest(strategy = "0i64..16")] i64,
    ),
    #[proptest(weight = 2)]
    DeleteExisting(Pick),
    #[proptest(weight = 1)]
    Update(Pick, #[proptest(strategy = "score()")] f64),
    #[proptest(weight = 2)]
    Range(
        #[proptest(strategy = "score()")] f64,
        #[proptest(strategy = "score()")] f64,
    ),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 20_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=600), seed in any::<u64>()) {
        let mut t = RankIndex::with_config(IndexConfig::new().seed(seed)).unwrap();
        let mut m = Model::default();

        for op in ops {
            match op {
                Op::Insert(s, id) => {
                    t.insert(s, id).unwrap();
                    m.insert(s, id);
                }
                Op::Delete(s, id) => {
                    prop_assert_eq!(t.delete(s, id), m.delete(s, id));
                }
                Op::DeleteExisting(pick) => {
                    if !m.0.is_empty() {
                        let (s, id) = m.0[pick.index(m.0.len())];
                        prop_assert!(t.delete(s, id));
                        prop_assert!(m.delete(s, id));
                    }
                }
                Op::Update(pick, new_score) => {
                    if !m.0.is_empty() {
                        let (s, id) = m.0[pick.index(m.0.len())];
                        let moved = t.update_score(s, id, new_score).unwrap();
                        prop_assert_eq!(t.get(moved.unwrap()), Some(Entry::new(id, new_score)));
                        m.delete(s, id);
                        m.insert(new_score, id);
                    }
                }
                Op::Range(min, max) => {
                    let expected = m.range(min, max);
                    prop_assert_eq!(t.count(min, max), expected.len());
                    prop_assert_eq!(t.collect(min, max).unwrap(), expected.clone());
                    prop_assert_eq!(t.collect_scalar(min, max).unwrap(), expected.clone());
                    prop_assert_eq!(t.collect_vectorized(min, max).unwrap(), expected);
                }
            }
            prop_assert_eq!(t.len(), m.0.len());
        }

        validate_index(&t);
        let got: Vec<Entry> = t.iter().collect();
        prop_assert_eq!(&got, &m.entries());
        let back: Vec<Entry> = t.iter().rev().collect();
        prop_assert!(back.iter().eq(got.iter().rev()));

        for (pos, &(s, id)) in m.0.iter().enumerate() {
            let first = m.slot(s, id) + 1;
            prop_assert_eq!(t.rank(s, id), Some(first));
            prop_assert_eq!(t.get_by_rank(pos + 1), Some(Entry::new(id, s)));
        }
    }

    #[test]
    fn prop_vectorized_matches_scalar(
        scores in prop::collection::vec(-50.0f64..50.0, 0..300),
        min in -60.0f64..60.0,
        width in 0.0f64..40.0,
    ) {
        let mut t = RankIndex::with_config(IndexConfig::new().seed(17)).unwrap();
        for (id, &s) in scores.iter().enumerate() {
            t.insert(s, id as i64).unwrap();
        }
        let max = min + width;
        let scalar = t.collect_scalar(min, max).unwrap();
        prop_assert_eq!(scalar.len(), t.count(min, max));
        prop_assert_eq!(&t.collect_vectorized(min, max).unwrap(), &scalar);
        prop_assert_eq!(&t.collect(min, max).unwrap(), &scalar);
        for cap in [VectorCapability::Portable, VectorCapability::Sse2, VectorCapability::Avx, VectorCapability::Neon] {
            if let Some(c) = VectorCollector::with_capability(cap) {
                prop_assert_eq!(&t.collect_with(&c, min, max).unwrap(), &scalar);
            }
        }
    }
}

/// Visit every ordering of `items` (Heap's algorithm, non-recursive).
fn each_ordering<T: Copy>(items: &[T], mut visit: impl FnMut(&[T])) {
    let mut order = items.to_vec();
    let mut counters = vec![0usize; order.len()];
    visit(&order);

    let mut i = 1;
    while i < order.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            order.swap(j, i);
            visit(&order);
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}

const SMALL_SET: [(f64, i64); 6] = [
    (1.0, 1),
    (1.0, 2),
    (2.0, 0),
    (0.5, 9),
    (3.0, 3),
    (2.0, 5),
];

#[test]
fn exhaustive_insert_order_small_set() {
    let mut expected: Vec<(f64, i64)> = SMALL_SET.to_vec();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let expected: Vec<Entry> = expected.iter().map(|&(s, i)| Entry::new(i, s)).collect();

    let mut seed = 0u64;
    each_ordering(&SMALL_SET, |order| {
        seed += 1;
        let mut t = RankIndex::with_config(IndexConfig::new().seed(seed)).unwrap();
        for &(s, id) in order {
            t.insert(s, id).unwrap();
        }
        validate_index(&t);
        let got: Vec<Entry> = t.iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    // Tall nodes exercise span merging on every level.
    let mut base = RankIndex::with_config(IndexConfig::new().seed(99)).unwrap();
    for &(s, id) in &SMALL_SET {
        base.insert(s, id).unwrap();
    }
    validate_index(&base);

    each_ordering(&SMALL_SET, |order| {
        let mut t = base.clone();
        let mut remaining = SMALL_SET.len();
        for &(s, id) in order {
            assert!(t.delete(s, id));
            remaining -= 1;
            assert_eq!(t.len(), remaining);
            validate_index(&t);
        }
        assert_eq!(t.len(), 0);
        assert_eq!(t.level(), 1);
        assert!(t.tail.is_nil());
    });
}

#[test]
fn seeded_random_insert_delete_matches_model() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(2);
    let mut t = RankIndex::with_config(IndexConfig::new().seed(2)).unwrap();
    let mut m = Model::default();

    for _ in 0..20_000 {
        let s = f64::from(rng.gen_range(0u32..500));
        let id = rng.gen_range(0i64..50);
        match rng.gen_range(0..100) {
            0..=54 => {
                t.insert(s, id).unwrap();
                m.insert(s, id);
            }
            55..=89 => assert_eq!(t.delete(s, id), m.delete(s, id)),
            _ => {
                let max = s + f64::from(rng.gen_range(0u32..100));
                assert_eq!(t.collect(s, max).unwrap(), m.range(s, max));
            }
        }
    }

    validate_index(&t);
    assert_eq!(t.iter().collect::<Vec<_>>(), m.entries());
}
