/// Input-validation failures raised by [`crate::NeighborSearch`].
///
/// Internal pruning-bound invariants are not represented here; those are
/// logic defects covered by the test suite, not runtime conditions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SearchError {
    /// Query and reference point sets disagree on dimensionality.
    #[error("dimension mismatch: reference points have {reference} coordinates, query points have {query}")]
    DimensionMismatch { reference: usize, query: usize },

    /// `k` was zero or exceeded the number of reference points.
    #[error("invalid neighbor count k={k}: must be between 1 and {max}")]
    InvalidK { k: usize, max: usize },
}
