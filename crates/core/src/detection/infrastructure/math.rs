//! Union-find clustering used by rectangle grouping.

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

/// Partition `0..n` into clusters of mutually connected elements.
///
/// `connected(i, j)` is evaluated for every pair; clusters are the
/// transitive closure. Groups hold ascending indices and are ordered by
/// their first element, so output follows input order.
pub fn partition<F>(n: usize, mut connected: F) -> Vec<Vec<usize>>
where
    F: FnMut(usize, usize) -> bool,
{
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if connected(i, j) {
                union(&mut parent, i, j);
            }
        }
    }

    let mut slot_of_root: Vec<Option<usize>> = vec![None; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        match slot_of_root[root] {
            Some(slot) => groups[slot].push(i),
            None => {
                slot_of_root[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_find_transitive() {
        let mut parent = vec![0, 1, 2];
        union(&mut parent, 0, 1);
        union(&mut parent, 1, 2);
        assert_eq!(find(&mut parent, 0), find(&mut parent, 2));
    }

    #[test]
    fn test_union_find_separate() {
        let mut parent = vec![0, 1, 2, 3];
        union(&mut parent, 0, 1);
        union(&mut parent, 2, 3);
        assert_ne!(find(&mut parent, 0), find(&mut parent, 2));
    }

    #[test]
    fn test_partition_follows_input_order() {
        // 0~2 and 1~3
        let groups = partition(4, |i, j| (i % 2) == (j % 2));
        assert_eq!(groups, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_partition_transitive_chain() {
        let values = [0, 5, 10, 100];
        let groups = partition(values.len(), |i, j| {
            (values[i] as i32 - values[j] as i32).abs() <= 5
        });
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(0, |_, _| true).is_empty());
    }
}
