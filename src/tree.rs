use crate::bound::HRectBound;
use ndarray::ArrayView2;
use num_traits::Float;
use std::cmp::Ordering;
use std::fmt::Debug;

/// Dense row-major point storage: `[x0_0, x0_1, ..., x1_0, ...]`.
///
/// The engine owns one of these per point set; tree construction reorders
/// its rows in place, never the caller's memory.
pub struct Dataset<T> {
    pub(crate) points: Vec<T>,
    rows: usize,
    dim: usize,
}

impl<T> Dataset<T>
where
    T: Float + Debug + Send + Sync,
{
    pub fn from_view(view: ArrayView2<T>) -> Self {
        let rows = view.nrows();
        let dim = view.ncols();
        let points = view.to_owned().into_raw_vec();
        Dataset { points, rows, dim }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, idx: usize) -> &[T] {
        let start = idx * self.dim;
        &self.points[start..start + self.dim]
    }

    pub fn coord(&self, idx: usize, d: usize) -> T {
        self.points[idx * self.dim + d]
    }
}

/// One node of the binary space tree: a bounding region and a contiguous
/// range of rows in the (reordered) dataset. Internal nodes carry the arena
/// ids of their two children.
pub struct KdNode<T> {
    pub bound: HRectBound<T>,
    pub begin: usize,
    pub count: usize,
    pub children: Option<(usize, usize)>,
}

impl<T> KdNode<T> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn end(&self) -> usize {
        self.begin + self.count
    }
}

/// Binary space tree over a [`Dataset`], stored as an arena of nodes
/// addressed by index; node 0 is the root.
///
/// Built by recursive median split on the widest bound dimension. Building
/// permutes the dataset rows; the returned `old_from_new` array maps a
/// permuted row position back to the caller's original position.
pub struct KdTree<T> {
    nodes: Vec<KdNode<T>>,
}

pub const ROOT: usize = 0;

impl<T> KdTree<T>
where
    T: Float + Debug + Send + Sync,
{
    pub fn build(data: &mut Dataset<T>, leaf_size: usize) -> (Self, Vec<usize>) {
        let leaf_size = leaf_size.max(1);
        let mut old_from_new: Vec<usize> = (0..data.rows()).collect();
        let mut nodes = Vec::new();
        build_node(data, 0, data.rows(), leaf_size, &mut nodes, &mut old_from_new);
        (KdTree { nodes }, old_from_new)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> &KdNode<T> {
        &self.nodes[id]
    }

    pub fn bound(&self, id: usize) -> &HRectBound<T> {
        &self.nodes[id].bound
    }
}

fn build_node<T>(
    data: &mut Dataset<T>,
    begin: usize,
    count: usize,
    leaf_size: usize,
    nodes: &mut Vec<KdNode<T>>,
    old_from_new: &mut [usize],
) -> usize
where
    T: Float + Debug + Send + Sync,
{
    let id = nodes.len();
    let mut bound = HRectBound::new(data.dim());
    for r in begin..begin + count {
        bound.expand(data.row(r));
    }
    nodes.push(KdNode {
        bound,
        begin,
        count,
        children: None,
    });

    if count <= leaf_size {
        return id;
    }

    let split_dim = nodes[id].bound.widest_dimension();

    // Order the range by the split coordinate, then apply that order to the
    // rows and the permutation in one gather pass.
    let mut order: Vec<usize> = (begin..begin + count).collect();
    order.sort_unstable_by(|&a, &b| {
        data.coord(a, split_dim)
            .partial_cmp(&data.coord(b, split_dim))
            .unwrap_or(Ordering::Equal)
    });

    let dim = data.dim();
    let mut row_buf: Vec<T> = Vec::with_capacity(count * dim);
    for &r in &order {
        row_buf.extend_from_slice(data.row(r));
    }
    data.points[begin * dim..(begin + count) * dim].copy_from_slice(&row_buf);

    let perm_buf: Vec<usize> = order.iter().map(|&r| old_from_new[r]).collect();
    old_from_new[begin..begin + count].copy_from_slice(&perm_buf);

    let mid = count / 2;
    let left = build_node(data, begin, mid, leaf_size, nodes, old_from_new);
    let right = build_node(data, begin + mid, count - mid, leaf_size, nodes, old_from_new);
    nodes[id].children = Some((left, right));
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn fixture(n: usize) -> Array2<f64> {
        // Deterministic scatter with distinct coordinates.
        Array2::from_shape_fn((n, 3), |(i, j)| {
            let v = (i * 7 + j * 13) % 29;
            v as f64 + (i as f64) * 0.01
        })
    }

    #[test]
    fn permutation_is_a_bijection_onto_originals() {
        let original = fixture(40);
        let mut data = Dataset::from_view(original.view());
        let (_, old_from_new) = KdTree::build(&mut data, 4);

        let mut seen = vec![false; 40];
        for &old in &old_from_new {
            assert!(!seen[old]);
            seen[old] = true;
        }
        // Each permuted row is the original row it claims to be.
        for new in 0..40 {
            let old = old_from_new[new];
            for d in 0..3 {
                assert_eq!(data.coord(new, d), original[[old, d]]);
            }
        }
    }

    #[test]
    fn leaves_partition_the_dataset_in_order() {
        let original = fixture(33);
        let mut data = Dataset::from_view(original.view());
        let (tree, _) = KdTree::build(&mut data, 5);

        let mut leaves: Vec<(usize, usize)> = (0..tree.len())
            .filter(|&id| tree.node(id).is_leaf())
            .map(|id| (tree.node(id).begin, tree.node(id).count))
            .collect();
        leaves.sort_unstable();

        let mut next = 0;
        for (begin, count) in leaves {
            assert_eq!(begin, next);
            assert!(count >= 1 && count <= 5);
            next = begin + count;
        }
        assert_eq!(next, 33);
    }

    #[test]
    fn node_bounds_contain_their_points() {
        let original = fixture(50);
        let mut data = Dataset::from_view(original.view());
        let (tree, _) = KdTree::build(&mut data, 3);

        for id in 0..tree.len() {
            let node = tree.node(id);
            for r in node.begin..node.end() {
                assert!(node.bound.contains(data.row(r)));
            }
        }
    }

    #[test]
    fn children_cover_parent_range() {
        let original = fixture(24);
        let mut data = Dataset::from_view(original.view());
        let (tree, _) = KdTree::build(&mut data, 2);

        for id in 0..tree.len() {
            let node = tree.node(id);
            if let Some((l, r)) = node.children {
                let left = tree.node(l);
                let right = tree.node(r);
                assert_eq!(left.begin, node.begin);
                assert_eq!(left.end(), right.begin);
                assert_eq!(right.end(), node.end());
            }
        }
    }

    #[test]
    fn small_dataset_builds_a_single_leaf() {
        let original = fixture(3);
        let mut data = Dataset::from_view(original.view());
        let (tree, old_from_new) = KdTree::build(&mut data, 20);
        assert_eq!(tree.len(), 1);
        assert!(tree.node(ROOT).is_leaf());
        assert_eq!(old_from_new, vec![0, 1, 2]);
    }
}
