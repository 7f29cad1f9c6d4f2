use num_traits::{Float, NumCast};
use std::fmt::Debug;
use wide::{f32x8, f64x4};

/// A symmetric, non-negative distance function over points given as
/// coordinate slices.
///
/// Implementations may carry internal data (see [`WeightedEuclidean`]).
/// The tree-based search strategies additionally require the metric to be
/// monotone non-decreasing in each per-coordinate absolute difference, so
/// that rectangle bounds evaluated on representative points stay
/// conservative. Every metric in this module satisfies that; naive search
/// works with any symmetric distance.
pub trait Metric<T>: Send + Sync {
    fn distance(&self, p1: &[T], p2: &[T]) -> T;
}

/// Squared L2 distance. The default metric of the search engine: it orders
/// points identically to [`Euclidean`] while skipping the square root.
#[derive(Copy, Clone, Debug, Default)]
pub struct SquaredEuclidean;

impl<T> Metric<T> for SquaredEuclidean
where
    T: Float + Debug + Send + Sync,
{
    fn distance(&self, p1: &[T], p2: &[T]) -> T {
        squared_distance_simd(p1, p2)
    }
}

/// L2 distance.
#[derive(Copy, Clone, Debug, Default)]
pub struct Euclidean;

impl<T> Metric<T> for Euclidean
where
    T: Float + Debug + Send + Sync,
{
    fn distance(&self, p1: &[T], p2: &[T]) -> T {
        squared_distance_simd(p1, p2).sqrt()
    }
}

/// L1 distance.
#[derive(Copy, Clone, Debug, Default)]
pub struct Manhattan;

impl<T> Metric<T> for Manhattan
where
    T: Float + Debug + Send + Sync,
{
    fn distance(&self, p1: &[T], p2: &[T]) -> T {
        debug_assert_eq!(p1.len(), p2.len());
        let mut acc = T::zero();
        for i in 0..p1.len() {
            acc = acc + (p1[i] - p2[i]).abs();
        }
        acc
    }
}

/// Squared L2 distance with a per-axis weight, i.e. a diagonal Mahalanobis
/// form. Axes beyond `weights.len()` get weight one.
pub struct WeightedEuclidean<T> {
    weights: Vec<T>,
}

impl<T> WeightedEuclidean<T>
where
    T: Float + Debug + Send + Sync,
{
    pub fn new(weights: Vec<T>) -> Self {
        WeightedEuclidean { weights }
    }
}

impl<T> Metric<T> for WeightedEuclidean<T>
where
    T: Float + Debug + Send + Sync,
{
    fn distance(&self, p1: &[T], p2: &[T]) -> T {
        debug_assert_eq!(p1.len(), p2.len());
        let mut acc = T::zero();
        for i in 0..p1.len() {
            let w = self.weights.get(i).copied().unwrap_or_else(T::one);
            let diff = p1[i] - p2[i];
            acc = acc + w * diff * diff;
        }
        acc
    }
}

#[inline(always)]
fn squared_distance_simd<T>(a: &[T], b: &[T]) -> T
where
    T: Float + Debug + Send + Sync,
{
    debug_assert_eq!(a.len(), b.len());
    if std::mem::size_of::<T>() == 4 {
        let avf: &[f32] =
            unsafe { std::slice::from_raw_parts(a.as_ptr() as *const f32, a.len()) };
        let bvf: &[f32] =
            unsafe { std::slice::from_raw_parts(b.as_ptr() as *const f32, b.len()) };
        let mut acc = 0.0f32;
        let chunks = avf.len() / 8;
        let tail_start = chunks * 8;
        let mut i = 0;
        while i < tail_start {
            let va = f32x8::from([
                avf[i],
                avf[i + 1],
                avf[i + 2],
                avf[i + 3],
                avf[i + 4],
                avf[i + 5],
                avf[i + 6],
                avf[i + 7],
            ]);
            let vb = f32x8::from([
                bvf[i],
                bvf[i + 1],
                bvf[i + 2],
                bvf[i + 3],
                bvf[i + 4],
                bvf[i + 5],
                bvf[i + 6],
                bvf[i + 7],
            ]);
            let diff = va - vb;
            acc += (diff * diff).reduce_add();
            i += 8;
        }
        for j in tail_start..avf.len() {
            let d = avf[j] - bvf[j];
            acc += d * d;
        }
        return NumCast::from(acc).unwrap();
    }
    if std::mem::size_of::<T>() == 8 {
        let avf: &[f64] =
            unsafe { std::slice::from_raw_parts(a.as_ptr() as *const f64, a.len()) };
        let bvf: &[f64] =
            unsafe { std::slice::from_raw_parts(b.as_ptr() as *const f64, b.len()) };
        let mut acc = 0.0f64;
        let chunks = avf.len() / 4;
        let tail_start = chunks * 4;
        let mut i = 0;
        while i < tail_start {
            let va = f64x4::from([avf[i], avf[i + 1], avf[i + 2], avf[i + 3]]);
            let vb = f64x4::from([bvf[i], bvf[i + 1], bvf[i + 2], bvf[i + 3]]);
            let diff = va - vb;
            acc += (diff * diff).reduce_add();
            i += 4;
        }
        for j in tail_start..avf.len() {
            let d = avf[j] - bvf[j];
            acc += d * d;
        }
        return NumCast::from(acc).unwrap();
    }

    // Fallback scalar
    let mut acc = T::zero();
    for i in 0..a.len() {
        let diff = a[i] - b[i];
        acc = acc + diff * diff;
    }
    acc
}
