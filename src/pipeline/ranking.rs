//! Score normalisation and ranking.

use std::cmp::Ordering;

/// Logistic squash of a raw relevance logit into `[0, 1]`. NaN maps to 0.
#[inline]
pub fn sigmoid(raw: f32) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    1.0 / (1.0 + (-f64::from(raw)).exp())
}

/// Number of results kept for `top_n` over `len` documents.
pub fn effective_count(top_n: Option<i64>, len: usize) -> usize {
    match top_n {
        None => len,
        Some(n) if n <= 0 => 0,
        Some(n) => usize::try_from(n).map_or(len, |n| n.min(len)),
    }
}

/// A scored document position before truncation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub index: usize,
    pub raw: f32,
    pub relevance: f64,
}

/// Orders documents by raw score, best first, keeping at most `count`.
///
/// The sort is stable: equal scores keep ascending original index. NaN sorts
/// after every number.
pub fn rank(scores: &[f32], count: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = scores
        .iter()
        .enumerate()
        .map(|(index, &raw)| Ranked {
            index,
            raw,
            relevance: sigmoid(raw),
        })
        .collect();

    ranked.sort_by(|a, b| descending(a.raw, b.raw));
    ranked.truncate(count);
    ranked
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
