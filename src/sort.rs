use crate::bound::HRectBound;
use crate::metric::Metric;
use num_traits::Float;

/// Ordering policy: what "better" means between two candidate distances,
/// plus the conservative bound primitives the pruning logic needs.
///
/// The bound functions must never overstate how good the true best case
/// is; pruning relies on that. Both policies here realize their bounds by
/// handing the metric a representative point pair extracted from the
/// rectangles, which is exact for the metrics this crate ships.
pub trait SortPolicy<T>: Send + Sync
where
    T: Float,
{
    /// Value no real distance can be worse than. Seeds empty candidate
    /// slots and node bounds.
    fn worst_distance() -> T;

    /// Value no real distance can be better than.
    fn best_distance() -> T;

    /// True if `value` should rank strictly ahead of `other`.
    fn is_better(value: T, other: T) -> bool;

    /// Best distance any point inside `bound` could achieve to `point`.
    fn best_point_to_node(metric: &dyn Metric<T>, point: &[T], bound: &HRectBound<T>) -> T;

    /// Best distance achievable between any point pair drawn from the two
    /// regions.
    fn best_node_to_node(metric: &dyn Metric<T>, a: &HRectBound<T>, b: &HRectBound<T>) -> T;
}

/// Rank smaller distances first: k-nearest-neighbor search.
#[derive(Copy, Clone, Debug, Default)]
pub struct NearestNeighborSort;

impl<T> SortPolicy<T> for NearestNeighborSort
where
    T: Float,
{
    fn worst_distance() -> T {
        T::infinity()
    }

    fn best_distance() -> T {
        T::zero()
    }

    fn is_better(value: T, other: T) -> bool {
        value < other
    }

    fn best_point_to_node(metric: &dyn Metric<T>, point: &[T], bound: &HRectBound<T>) -> T {
        metric.distance(point, &bound.closest_to(point))
    }

    fn best_node_to_node(metric: &dyn Metric<T>, a: &HRectBound<T>, b: &HRectBound<T>) -> T {
        let (pa, pb) = a.closest_pair(b);
        metric.distance(&pa, &pb)
    }
}

/// Rank larger distances first: k-farthest-neighbor search.
#[derive(Copy, Clone, Debug, Default)]
pub struct FurthestNeighborSort;

impl<T> SortPolicy<T> for FurthestNeighborSort
where
    T: Float,
{
    fn worst_distance() -> T {
        T::zero()
    }

    fn best_distance() -> T {
        T::infinity()
    }

    fn is_better(value: T, other: T) -> bool {
        value > other
    }

    fn best_point_to_node(metric: &dyn Metric<T>, point: &[T], bound: &HRectBound<T>) -> T {
        metric.distance(point, &bound.farthest_to(point))
    }

    fn best_node_to_node(metric: &dyn Metric<T>, a: &HRectBound<T>, b: &HRectBound<T>) -> T {
        let (pa, pb) = a.farthest_pair(b);
        metric.distance(&pa, &pb)
    }
}
