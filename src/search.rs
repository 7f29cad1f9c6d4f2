use crate::candidates::{CandidateLists, INVALID_NEIGHBOR};
use crate::error::SearchError;
use crate::metric::Metric;
use crate::sort::SortPolicy;
use crate::telemetry::SearchTelemetry;
use crate::tree::{Dataset, KdTree, ROOT};
use ndarray::{Array2, ArrayView2};
use num_traits::Float;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Strategy and tree-construction knobs.
///
/// `naive` runs the exhaustive O(|query|·|reference|) baseline and
/// overrides `single_mode`. `leaf_size` only affects trees the engine
/// builds itself.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub naive: bool,
    pub single_mode: bool,
    pub leaf_size: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            naive: false,
            single_mode: false,
            leaf_size: 20,
        }
    }
}

/// A tree the engine either built (and owns) or was handed (and must not
/// drop). Ownership is tracked per tree; dropping the engine drops only
/// the `Owned` variants.
enum TreeHandle<'a, T> {
    None,
    Owned(KdTree<T>),
    Borrowed(&'a KdTree<T>),
}

impl<'a, T> TreeHandle<'a, T> {
    fn get(&self) -> Option<&KdTree<T>> {
        match self {
            TreeHandle::None => None,
            TreeHandle::Owned(tree) => Some(tree),
            TreeHandle::Borrowed(tree) => Some(tree),
        }
    }
}

/// Proximity search engine: for every query point, the k reference points
/// ranked best by the sort policy `S` under metric `M`.
///
/// Constructed once per workload; trees are built (or accepted pre-built)
/// at construction. Each [`search`](NeighborSearch::search) call runs one
/// of three strategies — naive, single-tree, dual-tree — and returns
/// `k × n_queries` index and distance matrices in original input order,
/// rows sorted best-to-worst.
///
/// With no query set the reference set queries itself, and a point is
/// never reported as its own neighbor.
///
/// Pre-built-tree constructors assume the supplied point set is already in
/// that tree's row order; the engine cannot verify this and results are
/// undefined if it does not hold.
pub struct NeighborSearch<'a, T, S, M> {
    reference: Dataset<T>,
    queries: Option<Dataset<T>>,
    reference_tree: TreeHandle<'a, T>,
    query_tree: TreeHandle<'a, T>,
    old_from_new_refs: Vec<usize>,
    old_from_new_queries: Vec<usize>,
    naive: bool,
    single_mode: bool,
    metric: M,
    telemetry: SearchTelemetry,
    _sort: PhantomData<fn() -> S>,
}

impl<'a, T, S, M> NeighborSearch<'a, T, S, M>
where
    T: Float + Debug + Send + Sync,
    S: SortPolicy<T>,
    M: Metric<T>,
{
    /// Self-search over `reference`: every point queries the set it
    /// belongs to.
    pub fn new(reference: ArrayView2<T>, metric: M, options: SearchOptions) -> Self {
        let mut reference = Dataset::from_view(reference);
        let (reference_tree, old_from_new_refs) = if options.naive {
            (TreeHandle::None, Vec::new())
        } else {
            let (tree, perm) = KdTree::build(&mut reference, options.leaf_size);
            (TreeHandle::Owned(tree), perm)
        };
        NeighborSearch {
            reference,
            queries: None,
            reference_tree,
            query_tree: TreeHandle::None,
            old_from_new_refs,
            old_from_new_queries: Vec::new(),
            naive: options.naive,
            single_mode: options.single_mode,
            metric,
            telemetry: SearchTelemetry::default(),
            _sort: PhantomData,
        }
    }

    /// Search `reference` for the neighbors of a separate query set.
    pub fn with_query_set(
        reference: ArrayView2<T>,
        queries: ArrayView2<T>,
        metric: M,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        if reference.ncols() != queries.ncols() {
            return Err(SearchError::DimensionMismatch {
                reference: reference.ncols(),
                query: queries.ncols(),
            });
        }
        let mut reference = Dataset::from_view(reference);
        let mut queries = Dataset::from_view(queries);

        let (reference_tree, old_from_new_refs) = if options.naive {
            (TreeHandle::None, Vec::new())
        } else {
            let (tree, perm) = KdTree::build(&mut reference, options.leaf_size);
            (TreeHandle::Owned(tree), perm)
        };
        // Dual-tree is the only strategy that indexes the query side.
        let (query_tree, old_from_new_queries) = if options.naive || options.single_mode {
            (TreeHandle::None, Vec::new())
        } else {
            let (tree, perm) = KdTree::build(&mut queries, options.leaf_size);
            (TreeHandle::Owned(tree), perm)
        };

        Ok(NeighborSearch {
            reference,
            queries: Some(queries),
            reference_tree,
            query_tree,
            old_from_new_refs,
            old_from_new_queries,
            naive: options.naive,
            single_mode: options.single_mode,
            metric,
            telemetry: SearchTelemetry::default(),
            _sort: PhantomData,
        })
    }

    /// Self-search with a caller-built reference tree. `reference` must
    /// already be in the tree's row order.
    pub fn with_reference_tree(
        reference: ArrayView2<T>,
        tree: &'a KdTree<T>,
        metric: M,
        options: SearchOptions,
    ) -> Self {
        NeighborSearch {
            reference: Dataset::from_view(reference),
            queries: None,
            reference_tree: TreeHandle::Borrowed(tree),
            query_tree: TreeHandle::None,
            old_from_new_refs: Vec::new(),
            old_from_new_queries: Vec::new(),
            naive: options.naive,
            single_mode: options.single_mode,
            metric,
            telemetry: SearchTelemetry::default(),
            _sort: PhantomData,
        }
    }

    /// Separate query set with a caller-built reference tree and,
    /// optionally, a caller-built query tree. Supplied point sets must be
    /// in their tree's row order. If dual-tree mode needs a query tree and
    /// none is given, one is built (and owned) over a copy of `queries`.
    pub fn with_trees(
        reference: ArrayView2<T>,
        reference_tree: &'a KdTree<T>,
        queries: ArrayView2<T>,
        query_tree: Option<&'a KdTree<T>>,
        metric: M,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        if reference.ncols() != queries.ncols() {
            return Err(SearchError::DimensionMismatch {
                reference: reference.ncols(),
                query: queries.ncols(),
            });
        }
        let mut queries = Dataset::from_view(queries);
        let (query_tree, old_from_new_queries) = match query_tree {
            Some(tree) => (TreeHandle::Borrowed(tree), Vec::new()),
            None if !options.naive && !options.single_mode => {
                let (tree, perm) = KdTree::build(&mut queries, options.leaf_size);
                (TreeHandle::Owned(tree), perm)
            }
            None => (TreeHandle::None, Vec::new()),
        };
        Ok(NeighborSearch {
            reference: Dataset::from_view(reference),
            queries: Some(queries),
            reference_tree: TreeHandle::Borrowed(reference_tree),
            query_tree,
            old_from_new_refs: Vec::new(),
            old_from_new_queries,
            naive: options.naive,
            single_mode: options.single_mode,
            metric,
            telemetry: SearchTelemetry::default(),
            _sort: PhantomData,
        })
    }

    /// Counters from the most recent [`search`](NeighborSearch::search).
    pub fn telemetry(&self) -> &SearchTelemetry {
        &self.telemetry
    }

    /// Find the k best reference points for every query point.
    ///
    /// Returns `(neighbors, distances)`, both `k × n_queries`, columns in
    /// original query order and rows sorted best-to-worst. Candidate slots
    /// no reference point could fill (self-search with `k` equal to the
    /// reference count) hold [`INVALID_NEIGHBOR`] and the policy's worst
    /// distance.
    pub fn search(&mut self, k: usize) -> Result<(Array2<usize>, Array2<T>), SearchError> {
        let n_ref = self.reference.rows();
        if k == 0 || k > n_ref {
            return Err(SearchError::InvalidK { k, max: n_ref });
        }
        let n_queries = self.queries.as_ref().map_or(n_ref, Dataset::rows);
        let mut lists = CandidateLists::new::<S>(k, n_queries);
        self.telemetry = SearchTelemetry::default();

        if self.naive {
            naive_search::<T, S, M>(
                &self.reference,
                self.queries.as_ref(),
                &self.metric,
                &mut lists,
                &mut self.telemetry,
            );
        } else if self.single_mode {
            let tree = self
                .reference_tree
                .get()
                .expect("tree-based modes build a reference tree at construction");
            match &self.queries {
                None => {
                    for qi in 0..n_ref {
                        let mut best = lists.kth(qi);
                        single_recursion::<T, S, M>(
                            tree,
                            &self.reference,
                            &self.metric,
                            qi,
                            self.reference.row(qi),
                            true,
                            ROOT,
                            &mut best,
                            &mut lists,
                            &mut self.telemetry,
                        );
                    }
                }
                Some(query_set) => {
                    for qi in 0..query_set.rows() {
                        let mut best = lists.kth(qi);
                        single_recursion::<T, S, M>(
                            tree,
                            &self.reference,
                            &self.metric,
                            qi,
                            query_set.row(qi),
                            false,
                            ROOT,
                            &mut best,
                            &mut lists,
                            &mut self.telemetry,
                        );
                    }
                }
            }
        } else {
            let reference_tree = self
                .reference_tree
                .get()
                .expect("tree-based modes build a reference tree at construction");
            match &self.queries {
                None => {
                    // Self-search: the reference tree plays both roles.
                    let mut node_bounds = vec![S::worst_distance(); reference_tree.len()];
                    let score = S::best_node_to_node(
                        &self.metric,
                        reference_tree.bound(ROOT),
                        reference_tree.bound(ROOT),
                    );
                    dual_recursion::<T, S, M>(
                        reference_tree,
                        reference_tree,
                        &self.reference,
                        &self.reference,
                        true,
                        ROOT,
                        ROOT,
                        score,
                        &mut node_bounds,
                        &mut lists,
                        &self.metric,
                        &mut self.telemetry,
                    );
                }
                Some(query_set) => {
                    let query_tree = self
                        .query_tree
                        .get()
                        .expect("dual-tree mode builds a query tree at construction");
                    let mut node_bounds = vec![S::worst_distance(); query_tree.len()];
                    let score = S::best_node_to_node(
                        &self.metric,
                        query_tree.bound(ROOT),
                        reference_tree.bound(ROOT),
                    );
                    dual_recursion::<T, S, M>(
                        query_tree,
                        reference_tree,
                        query_set,
                        &self.reference,
                        false,
                        ROOT,
                        ROOT,
                        score,
                        &mut node_bounds,
                        &mut lists,
                        &self.metric,
                        &mut self.telemetry,
                    );
                }
            }
        }

        Ok(self.assemble(&lists))
    }

    /// Write the candidate lists into output matrices, translating both
    /// neighbor indices and query columns from tree order back to the
    /// caller's original order. Empty permutations are identities.
    fn assemble(&self, lists: &CandidateLists<T>) -> (Array2<usize>, Array2<T>) {
        let k = lists.k();
        let n_queries = lists.n_queries();
        let mut neighbors = Array2::from_elem((k, n_queries), INVALID_NEIGHBOR);
        let mut distances = Array2::from_elem((k, n_queries), S::worst_distance());

        let query_perm: &[usize] = if self.queries.is_none() {
            &self.old_from_new_refs
        } else {
            &self.old_from_new_queries
        };

        for qi in 0..n_queries {
            let col = if query_perm.is_empty() {
                qi
            } else {
                query_perm[qi]
            };
            for rank in 0..k {
                let neighbor = lists.index(qi, rank);
                if neighbor == INVALID_NEIGHBOR {
                    continue;
                }
                let mapped = if self.old_from_new_refs.is_empty() {
                    neighbor
                } else {
                    self.old_from_new_refs[neighbor]
                };
                neighbors[[rank, col]] = mapped;
                distances[[rank, col]] = lists.distance(qi, rank);
            }
        }
        (neighbors, distances)
    }
}

fn naive_search<T, S, M>(
    reference: &Dataset<T>,
    queries: Option<&Dataset<T>>,
    metric: &M,
    lists: &mut CandidateLists<T>,
    telemetry: &mut SearchTelemetry,
) where
    T: Float + Debug + Send + Sync,
    S: SortPolicy<T>,
    M: Metric<T>,
{
    let self_search = queries.is_none();
    let query_set = queries.unwrap_or(reference);
    for qi in 0..query_set.rows() {
        let point = query_set.row(qi);
        for rj in 0..reference.rows() {
            if self_search && qi == rj {
                continue;
            }
            let d = metric.distance(point, reference.row(rj));
            telemetry.distance_evals += 1;
            lists.insert::<S>(qi, rj, d);
        }
    }
}

/// Descend the reference tree for one query point, tightening `best` (the
/// point's current k-th distance) as leaves are processed and skipping any
/// subtree whose best case cannot beat it.
#[allow(clippy::too_many_arguments)]
fn single_recursion<T, S, M>(
    tree: &KdTree<T>,
    reference: &Dataset<T>,
    metric: &M,
    query_index: usize,
    point: &[T],
    self_search: bool,
    node: usize,
    best: &mut T,
    lists: &mut CandidateLists<T>,
    telemetry: &mut SearchTelemetry,
) where
    T: Float + Debug + Send + Sync,
    S: SortPolicy<T>,
    M: Metric<T>,
{
    match tree.node(node).children {
        None => {
            let leaf = tree.node(node);
            for rj in leaf.begin..leaf.end() {
                if self_search && query_index == rj {
                    continue;
                }
                let d = metric.distance(point, reference.row(rj));
                telemetry.distance_evals += 1;
                lists.insert::<S>(query_index, rj, d);
            }
            telemetry.base_cases += 1;
            *best = lists.kth(query_index);
        }
        Some((left, right)) => {
            let left_score = S::best_point_to_node(metric, point, tree.bound(left));
            let right_score = S::best_point_to_node(metric, point, tree.bound(right));
            // More promising child first; equal scores go left.
            let (first, first_score, second, second_score) =
                if S::is_better(right_score, left_score) {
                    (right, right_score, left, left_score)
                } else {
                    (left, left_score, right, right_score)
                };

            if S::is_better(first_score, *best) {
                single_recursion::<T, S, M>(
                    tree,
                    reference,
                    metric,
                    query_index,
                    point,
                    self_search,
                    first,
                    best,
                    lists,
                    telemetry,
                );
            } else {
                telemetry.prunes += 1;
            }
            // `best` may have tightened while visiting the first child.
            if S::is_better(second_score, *best) {
                single_recursion::<T, S, M>(
                    tree,
                    reference,
                    metric,
                    query_index,
                    point,
                    self_search,
                    second,
                    best,
                    lists,
                    telemetry,
                );
            } else {
                telemetry.prunes += 1;
            }
        }
    }
}

/// Joint recursion over a query node and a reference node.
///
/// `score` is the best node-to-node distance the pair could realize,
/// computed by the caller. `node_bounds[q]` is conservative: never better
/// than the worst current k-th distance over any query point in `q`'s
/// subtree. Leaf bounds are refreshed from the candidate lists after each
/// base case; an internal node takes the worse of its children's bounds.
#[allow(clippy::too_many_arguments)]
fn dual_recursion<T, S, M>(
    query_tree: &KdTree<T>,
    reference_tree: &KdTree<T>,
    query_set: &Dataset<T>,
    reference_set: &Dataset<T>,
    self_search: bool,
    query_node: usize,
    reference_node: usize,
    score: T,
    node_bounds: &mut [T],
    lists: &mut CandidateLists<T>,
    metric: &M,
    telemetry: &mut SearchTelemetry,
) where
    T: Float + Debug + Send + Sync,
    S: SortPolicy<T>,
    M: Metric<T>,
{
    if !S::is_better(score, node_bounds[query_node]) {
        telemetry.prunes += 1;
        return;
    }

    let q_children = query_tree.node(query_node).children;
    let r_children = reference_tree.node(reference_node).children;

    match (q_children, r_children) {
        (None, None) => {
            base_case::<T, S, M>(
                query_tree,
                reference_tree,
                query_set,
                reference_set,
                self_search,
                query_node,
                reference_node,
                lists,
                metric,
                telemetry,
            );
            // Refresh: the policy-worst k-th distance across this leaf's
            // points is the tightest bound ancestors may rely on.
            let leaf = query_tree.node(query_node);
            let mut worst = S::best_distance();
            for qi in leaf.begin..leaf.end() {
                let kth = lists.kth(qi);
                if S::is_better(worst, kth) {
                    worst = kth;
                }
            }
            node_bounds[query_node] = worst;
        }
        (None, Some((ref_left, ref_right))) => {
            let q_bound = query_tree.bound(query_node);
            let left_score =
                S::best_node_to_node(metric, q_bound, reference_tree.bound(ref_left));
            let right_score =
                S::best_node_to_node(metric, q_bound, reference_tree.bound(ref_right));
            let visits = if S::is_better(right_score, left_score) {
                [(ref_right, right_score), (ref_left, left_score)]
            } else {
                [(ref_left, left_score), (ref_right, right_score)]
            };
            for (child, child_score) in visits {
                dual_recursion::<T, S, M>(
                    query_tree,
                    reference_tree,
                    query_set,
                    reference_set,
                    self_search,
                    query_node,
                    child,
                    child_score,
                    node_bounds,
                    lists,
                    metric,
                    telemetry,
                );
            }
        }
        (Some((query_left, query_right)), _) => {
            let r_bound = reference_tree.bound(reference_node);
            for query_child in [query_left, query_right] {
                match r_children {
                    None => {
                        let child_score = S::best_node_to_node(
                            metric,
                            query_tree.bound(query_child),
                            r_bound,
                        );
                        dual_recursion::<T, S, M>(
                            query_tree,
                            reference_tree,
                            query_set,
                            reference_set,
                            self_search,
                            query_child,
                            reference_node,
                            child_score,
                            node_bounds,
                            lists,
                            metric,
                            telemetry,
                        );
                    }
                    Some((ref_left, ref_right)) => {
                        let q_bound = query_tree.bound(query_child);
                        let left_score =
                            S::best_node_to_node(metric, q_bound, reference_tree.bound(ref_left));
                        let right_score =
                            S::best_node_to_node(metric, q_bound, reference_tree.bound(ref_right));
                        let visits = if S::is_better(right_score, left_score) {
                            [(ref_right, right_score), (ref_left, left_score)]
                        } else {
                            [(ref_left, left_score), (ref_right, right_score)]
                        };
                        for (ref_child, child_score) in visits {
                            dual_recursion::<T, S, M>(
                                query_tree,
                                reference_tree,
                                query_set,
                                reference_set,
                                self_search,
                                query_child,
                                ref_child,
                                child_score,
                                node_bounds,
                                lists,
                                metric,
                                telemetry,
                            );
                        }
                    }
                }
            }
            // Propagate: a parent can claim no more than the worse of what
            // its children now guarantee.
            node_bounds[query_node] =
                worse_of::<T, S>(node_bounds[query_left], node_bounds[query_right]);
        }
    }
}

fn base_case<T, S, M>(
    query_tree: &KdTree<T>,
    reference_tree: &KdTree<T>,
    query_set: &Dataset<T>,
    reference_set: &Dataset<T>,
    self_search: bool,
    query_node: usize,
    reference_node: usize,
    lists: &mut CandidateLists<T>,
    metric: &M,
    telemetry: &mut SearchTelemetry,
) where
    T: Float + Debug + Send + Sync,
    S: SortPolicy<T>,
    M: Metric<T>,
{
    let q_leaf = query_tree.node(query_node);
    let r_leaf = reference_tree.node(reference_node);
    for qi in q_leaf.begin..q_leaf.end() {
        let point = query_set.row(qi);
        for rj in r_leaf.begin..r_leaf.end() {
            if self_search && qi == rj {
                continue;
            }
            let d = metric.distance(point, reference_set.row(rj));
            telemetry.distance_evals += 1;
            lists.insert::<S>(qi, rj, d);
        }
    }
    telemetry.base_cases += 1;
}

fn worse_of<T, S>(a: T, b: T) -> T
where
    T: Float,
    S: SortPolicy<T>,
{
    if S::is_better(a, b) {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::SquaredEuclidean;
    use crate::sort::{FurthestNeighborSort, NearestNeighborSort};
    use approx::assert_relative_eq;
    use ndarray::array;

    type Knn<'a> = NeighborSearch<'a, f64, NearestNeighborSort, SquaredEuclidean>;

    fn corner_points() -> ndarray::Array2<f64> {
        array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]]
    }

    #[test]
    fn self_search_corner_scenario_dual() {
        let points = corner_points();
        let mut engine = Knn::new(points.view(), SquaredEuclidean, SearchOptions::default());
        let (neighbors, distances) = engine.search(1).unwrap();

        // Point 0 is one unit from points 1 and 2.
        assert_relative_eq!(distances[[0, 0]], 1.0);
        assert!(neighbors[[0, 0]] == 1 || neighbors[[0, 0]] == 2);
        // Point 3's nearest non-self neighbors are (1,0) and (0,1), both 41 away.
        assert_relative_eq!(distances[[0, 3]], 41.0);
        assert!(neighbors[[0, 3]] == 1 || neighbors[[0, 3]] == 2);
    }

    #[test]
    fn self_search_corner_scenario_all_modes_agree() {
        let points = corner_points();
        for options in [
            SearchOptions {
                naive: true,
                ..Default::default()
            },
            SearchOptions {
                single_mode: true,
                leaf_size: 1,
                ..Default::default()
            },
            SearchOptions {
                leaf_size: 1,
                ..Default::default()
            },
        ] {
            let mut engine = Knn::new(points.view(), SquaredEuclidean, options);
            let (_, distances) = engine.search(2).unwrap();
            assert_relative_eq!(distances[[0, 0]], 1.0);
            assert_relative_eq!(distances[[1, 0]], 1.0);
            assert_relative_eq!(distances[[0, 3]], 41.0);
            assert_relative_eq!(distances[[1, 3]], 41.0);
        }
    }

    #[test]
    fn no_point_is_its_own_neighbor() {
        let points = corner_points();
        let mut engine = Knn::new(points.view(), SquaredEuclidean, SearchOptions::default());
        let (neighbors, _) = engine.search(3).unwrap();
        for col in 0..4 {
            for rank in 0..3 {
                assert_ne!(neighbors[[rank, col]], col);
            }
        }
    }

    #[test]
    fn k_equal_to_reference_count_leaves_sentinel_tail() {
        let points = corner_points();
        let mut engine = Knn::new(points.view(), SquaredEuclidean, SearchOptions::default());
        let (neighbors, distances) = engine.search(4).unwrap();
        for col in 0..4 {
            // Three real neighbors, then the untouched sentinel slot.
            for rank in 0..3 {
                assert_ne!(neighbors[[rank, col]], INVALID_NEIGHBOR);
            }
            assert_eq!(neighbors[[3, col]], INVALID_NEIGHBOR);
            assert_eq!(distances[[3, col]], f64::INFINITY);
        }
    }

    #[test]
    fn invalid_k_is_rejected() {
        let points = corner_points();
        let mut engine = Knn::new(points.view(), SquaredEuclidean, SearchOptions::default());
        assert!(matches!(
            engine.search(0),
            Err(SearchError::InvalidK { k: 0, max: 4 })
        ));
        assert!(matches!(
            engine.search(5),
            Err(SearchError::InvalidK { k: 5, max: 4 })
        ));
    }

    #[test]
    fn dimension_mismatch_fails_construction() {
        let reference = corner_points();
        let queries = array![[0.0, 0.0, 0.0]];
        let result = Knn::with_query_set(
            reference.view(),
            queries.view(),
            SquaredEuclidean,
            SearchOptions::default(),
        );
        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch {
                reference: 2,
                query: 3
            })
        ));
    }

    #[test]
    fn separate_query_set_dual() {
        let reference = corner_points();
        let queries = array![[0.1, 0.1], [4.9, 5.1]];
        let mut engine = Knn::with_query_set(
            reference.view(),
            queries.view(),
            SquaredEuclidean,
            SearchOptions {
                leaf_size: 1,
                ..Default::default()
            },
        )
        .unwrap();
        let (neighbors, distances) = engine.search(2).unwrap();

        assert_eq!(neighbors[[0, 0]], 0);
        assert_relative_eq!(distances[[0, 0]], 0.02);
        assert_eq!(neighbors[[0, 1]], 3);
        assert_relative_eq!(distances[[0, 1]], 0.02, epsilon = 1e-12);
    }

    #[test]
    fn furthest_policy_ranks_descending() {
        let points = corner_points();
        let mut engine = NeighborSearch::<f64, FurthestNeighborSort, SquaredEuclidean>::new(
            points.view(),
            SquaredEuclidean,
            SearchOptions {
                leaf_size: 1,
                ..Default::default()
            },
        );
        let (neighbors, distances) = engine.search(2).unwrap();
        // Everything is farthest from the outlier at (5, 5).
        for col in 0..3 {
            assert_eq!(neighbors[[0, col]], 3);
        }
        assert_relative_eq!(distances[[0, 0]], 50.0);
        assert!(distances[[0, 0]] >= distances[[1, 0]]);
    }

    #[test]
    fn borrowed_tree_results_match_naive_over_permuted_set() {
        let original = corner_points();
        let mut data = Dataset::from_view(original.view());
        let (tree, _) = KdTree::build(&mut data, 1);
        let permuted =
            ndarray::Array2::from_shape_fn((data.rows(), data.dim()), |(i, j)| data.coord(i, j));

        let mut borrowed = Knn::with_reference_tree(
            permuted.view(),
            &tree,
            SquaredEuclidean,
            SearchOptions::default(),
        );
        let (b_neighbors, b_distances) = borrowed.search(2).unwrap();

        let mut naive = Knn::new(
            permuted.view(),
            SquaredEuclidean,
            SearchOptions {
                naive: true,
                ..Default::default()
            },
        );
        let (n_neighbors, n_distances) = naive.search(2).unwrap();

        // Tie order may differ between traversal orders; distances must
        // match rank-wise and the index sets per query must agree.
        assert_eq!(b_distances, n_distances);
        for col in 0..4 {
            let mut b_set = [b_neighbors[[0, col]], b_neighbors[[1, col]]];
            let mut n_set = [n_neighbors[[0, col]], n_neighbors[[1, col]]];
            b_set.sort_unstable();
            n_set.sort_unstable();
            assert_eq!(b_set, n_set);
        }
    }

    #[test]
    fn clustered_data_prunes_node_pairs() {
        // Two tight clusters far apart: cross-cluster work is prunable.
        let mut rows = Vec::new();
        for i in 0..8 {
            rows.push([i as f64 * 0.01, 0.0]);
        }
        for i in 0..8 {
            rows.push([100.0 + i as f64 * 0.01, 0.0]);
        }
        let points = ndarray::Array2::from_shape_fn((16, 2), |(i, j)| rows[i][j]);
        let mut engine = Knn::new(
            points.view(),
            SquaredEuclidean,
            SearchOptions {
                leaf_size: 1,
                ..Default::default()
            },
        );
        engine.search(1).unwrap();
        assert!(engine.telemetry().prunes > 0);

        let mut naive = Knn::new(
            points.view(),
            SquaredEuclidean,
            SearchOptions {
                naive: true,
                ..Default::default()
            },
        );
        naive.search(1).unwrap();
        assert_eq!(naive.telemetry().prunes, 0);
        assert_eq!(naive.telemetry().distance_evals, 16 * 15);
    }
}
