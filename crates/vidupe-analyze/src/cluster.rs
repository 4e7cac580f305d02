//! Greedy representative clustering.

/// Partition `items` into clusters of indices.
///
/// Items are visited in order. The first item not yet assigned becomes a
/// representative and absorbs every later unassigned item for which
/// `is_match(representative, item)` holds. Membership is decided against
/// the representative only, so the relation is not made transitive: two
/// members of a cluster may not match each other, and an item matching a
/// non-representative member can land elsewhere.
///
/// Every index appears in exactly one cluster; clusters are returned in
/// representative order with the representative first.
pub fn greedy_clusters<T, F>(items: &[T], mut is_match: F) -> Vec<Vec<usize>>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut assigned = vec![false; items.len()];
    let mut clusters = Vec::new();

    for rep in 0..items.len() {
        if assigned[rep] {
            continue;
        }
        assigned[rep] = true;

        let mut cluster = vec![rep];
        for candidate in rep + 1..items.len() {
            if !assigned[candidate] && is_match(&items[rep], &items[candidate]) {
                assigned[candidate] = true;
                cluster.push(candidate);
            }
        }
        clusters.push(cluster);
    }

    clusters
}
