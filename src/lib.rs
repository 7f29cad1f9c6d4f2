//! Exact k-best proximity search over binary space trees.
//!
//! For every point in a query set, find the k reference points ranked best
//! by a pluggable [`SortPolicy`] (nearest, farthest, or any monotone
//! ordering) under a pluggable [`Metric`]. Three strategies are available:
//! the exhaustive baseline, single-tree descent per query point, and joint
//! dual-tree recursion, the latter two skipping whole subtrees whose best
//! case cannot beat what is already held.
//!
//! ```
//! use ndarray::array;
//! use neighborx::{AllNearestNeighbors, SearchOptions, SquaredEuclidean};
//!
//! let points = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];
//! let mut engine =
//!     AllNearestNeighbors::new(points.view(), SquaredEuclidean, SearchOptions::default());
//! let (neighbors, distances) = engine.search(1).unwrap();
//! assert!(neighbors[[0, 0]] == 1 || neighbors[[0, 0]] == 2);
//! assert_eq!(distances[[0, 0]], 1.0);
//! ```

mod bound;
mod candidates;
mod error;
mod metric;
mod search;
mod sort;
mod telemetry;
mod tree;

pub use bound::HRectBound;
pub use candidates::INVALID_NEIGHBOR;
pub use error::SearchError;
pub use metric::{Euclidean, Manhattan, Metric, SquaredEuclidean, WeightedEuclidean};
pub use search::{NeighborSearch, SearchOptions};
pub use sort::{FurthestNeighborSort, NearestNeighborSort, SortPolicy};
pub use telemetry::SearchTelemetry;
pub use tree::{Dataset, KdNode, KdTree, ROOT};

/// All-k-nearest-neighbors with the default metric.
pub type AllNearestNeighbors<'a, T> =
    NeighborSearch<'a, T, NearestNeighborSort, SquaredEuclidean>;

/// All-k-farthest-neighbors with the default metric.
pub type AllFurthestNeighbors<'a, T> =
    NeighborSearch<'a, T, FurthestNeighborSort, SquaredEuclidean>;
