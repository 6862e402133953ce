//! Parallel Partitioning
//!
//! Splits the flattened example list into `total` contiguous slices. Every
//! process computes the same ordering from the same seed, so the slices are
//! disjoint and together cover every example.

/// Start index and length of the slice run by one-indexed `node` out of `total`.
///
/// The first `length % total` nodes take one extra example. When there are
/// more nodes than examples, each node gets at most one.
pub fn parallelized_index_range(length: usize, total: usize, node: usize) -> (usize, usize) {
    if length == 0 || total == 0 || node == 0 {
        return (0, 0);
    }

    if total >= length {
        return if node > length { (0, 0) } else { (node - 1, 1) };
    }

    let min_per_node = length / total;
    let max_load_nodes = length % total;

    let preceding_max = (node - 1).min(max_load_nodes);
    let preceding_min = (node - 1) - preceding_max;

    let start = preceding_max * (min_per_node + 1) + preceding_min * min_per_node;
    let count = if node <= max_load_nodes {
        min_per_node + 1
    } else {
        min_per_node
    };

    (start, count)
}
