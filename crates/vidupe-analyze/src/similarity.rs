//! Longest-matching-blocks similarity ratio.
//!
//! The ratio is `2 * M / (len(a) + len(b))` where `M` is the number of
//! elements covered by the matching blocks found by recursively taking the
//! longest common run and repeating on both sides of it. For sequences of
//! 200 or more elements, elements of `b` occurring in more than 1% of
//! positions are not used to seed a match (they may still extend one).

use std::collections::HashMap;
use std::hash::Hash;

/// Sequences at least this long get popular-element pruning.
const POPULAR_MIN_LEN: usize = 200;

/// Case-insensitive similarity of two file names, in `[0, 1]`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    ratio(&a, &b)
}

/// Similarity ratio of two sequences, in `[0, 1]`. Two empty sequences score 1.
pub fn ratio<T: Eq + Hash>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_len(a, b) as f64 / total as f64
}

/// Total length of the matching blocks between `a` and `b`.
pub fn matching_len<T: Eq + Hash>(a: &[T], b: &[T]) -> usize {
    let index = BIndex::new(b);
    let mut stack = vec![(0, a.len(), 0, b.len())];
    let mut matched = 0;

    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = index.longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Positions of each element of `b`, ascending.
struct BIndex<'a, T> {
    positions: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> BIndex<'a, T> {
    fn new(b: &'a [T]) -> Self {
        let mut positions: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, item) in b.iter().enumerate() {
            positions.entry(item).or_default().push(j);
        }

        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            positions.retain(|_, js| js.len() <= limit);
        }

        Self { positions }
    }

    /// Longest run `a[i..i+k] == b[j..j+k]` inside the given bounds.
    ///
    /// Ties go to the smallest `i`, then the smallest `j`.
    fn longest_match(
        &self,
        a: &[T],
        b: &[T],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
        // run length of the match ending at (i - 1, j)
        let mut run_at: HashMap<usize, usize> = HashMap::new();

        for (i, item) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next_run: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.positions.get(item) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j > 0 {
                        run_at.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    } + 1;
                    next_run.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            run_at = next_run;
        }

        // Grow across elements that were pruned from the index
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi && best_j + best_k < bhi && a[best_i + best_k] == b[best_j + best_k]
        {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}
