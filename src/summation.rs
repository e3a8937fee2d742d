//! One-shot summation of whole sequences.
//!
//! Every algorithm comes in two shapes:
//!
//! - `sum_*(&[T])` sums a slice starting from zero;
//! - `sum_*_from(iter, start)` sums any iterator whose items convert into the
//!   accumulation type, starting from `start`.
//!
//! [`sum_pairwise`] needs random access and only takes a slice; use
//! [`Pairwise`] for iterators of unknown length.
//!
//! [`Summation`] names the algorithms so callers can pick one at runtime, and
//! [`sum_with`] dispatches on it.
//!
//! # Examples
//! ```
//! use u_numsum::summation::{sum_kbn, sum_naive, sum_with, Summation};
//! let xs: Vec<f64> = [1.0, 1e100, 1.0, -1e100].iter().map(|x| x * 10_000.0).collect();
//! assert_eq!(sum_kbn(&xs), 20_000.0);
//! assert_ne!(sum_naive(&xs), 20_000.0);
//! assert_eq!(sum_with(&xs, "precise".parse::<Summation>().unwrap()), 20_000.0);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::compensated::{add_components, Kahan, Kb2, Kbn, Naive, Pairwise};
use crate::float::{RealComponents, SumFloat};
use crate::summator::Summator;

// ---------------------------------------------------------------------------
// Stateless sums
// ---------------------------------------------------------------------------

/// Left-to-right sum with no error correction.
///
/// # Complexity
/// Time: O(n), Space: O(1)
pub fn sum_naive<T: RealComponents>(values: &[T]) -> T {
    sum_naive_from(values.iter().copied(), T::zero())
}

/// Left-to-right sum of `values` onto `start`.
pub fn sum_naive_from<T, I>(values: I, start: T) -> T
where
    T: RealComponents,
    I: IntoIterator,
    I::Item: Into<T>,
{
    let mut acc = Naive::with_value(start);
    acc.extend(values.into_iter().map(Into::into));
    acc.total()
}

/// Recursive pairwise summation.
///
/// Splits at the midpoint and adds the two half-sums, so rounding error
/// grows with the depth of the tree, O(log n), rather than with `n`.
///
/// # Complexity
/// Time: O(n), Space: O(log n) stack
///
/// # Examples
/// ```
/// use u_numsum::summation::sum_pairwise;
/// assert_eq!(sum_pairwise(&[1.0, 2.0, 3.0, 4.0]), 10.0);
/// assert_eq!(sum_pairwise::<f64>(&[]), 0.0);
/// ```
pub fn sum_pairwise<T: RealComponents>(values: &[T]) -> T {
    match values {
        [] => T::zero(),
        [x] => *x,
        [x, y] => add_components(*x, *y),
        _ => {
            let (left, right) = values.split_at(values.len() / 2);
            add_components(sum_pairwise(left), sum_pairwise(right))
        }
    }
}

/// Kahan compensated sum starting from zero.
///
/// # Complexity
/// Time: O(n), Space: O(1)
pub fn sum_kahan<T: RealComponents>(values: &[T]) -> T {
    sum_kahan_from(values.iter().copied(), T::zero())
}

/// Kahan compensated sum of `values` onto `start`.
pub fn sum_kahan_from<T, I>(values: I, start: T) -> T
where
    T: RealComponents,
    I: IntoIterator,
    I::Item: Into<T>,
{
    let mut acc = Kahan::with_value(start);
    acc.extend(values.into_iter().map(Into::into));
    acc.total()
}

/// Kahan–Babuška–Neumaier compensated sum starting from zero.
///
/// Complex values are compensated per component.
///
/// # Complexity
/// Time: O(n), Space: O(1)
pub fn sum_kbn<T: RealComponents>(values: &[T]) -> T {
    sum_kbn_from(values.iter().copied(), T::zero())
}

/// Kahan–Babuška–Neumaier compensated sum of `values` onto `start`.
pub fn sum_kbn_from<T, I>(values: I, start: T) -> T
where
    T: RealComponents,
    I: IntoIterator,
    I::Item: Into<T>,
{
    let mut acc = Kbn::with_value(start);
    acc.extend(values.into_iter().map(Into::into));
    acc.total()
}

/// Second-order Kahan–Babuška sum starting from zero.
///
/// # Complexity
/// Time: O(n), Space: O(1)
pub fn sum_kb2<T: RealComponents>(values: &[T]) -> T {
    sum_kb2_from(values.iter().copied(), T::zero())
}

/// Second-order Kahan–Babuška sum of `values` onto `start`.
pub fn sum_kb2_from<T, I>(values: I, start: T) -> T
where
    T: RealComponents,
    I: IntoIterator,
    I::Item: Into<T>,
{
    let mut acc = Kb2::with_value(start);
    acc.extend(values.into_iter().map(Into::into));
    acc.total()
}

/// Correctly-rounded sum via [`Summator`].
///
/// # Examples
/// ```
/// use u_numsum::summation::sum_precise;
/// assert_eq!(sum_precise([1e308, 1e308, -1e308]), 1e308);
/// ```
pub fn sum_precise<F, I>(values: I) -> F
where
    F: SumFloat,
    I: IntoIterator<Item = F>,
{
    values.into_iter().collect::<Summator<F>>().sum()
}

// ---------------------------------------------------------------------------
// Algorithm selection
// ---------------------------------------------------------------------------

/// A summation algorithm, selectable at runtime.
///
/// Parses from and displays as its lower-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Summation {
    /// [`sum_naive`]
    Naive,
    /// [`sum_pairwise`]
    #[default]
    Pairwise,
    /// [`sum_kahan`]
    Kahan,
    /// [`sum_kbn`]
    Kbn,
    /// [`sum_kb2`]
    Kb2,
    /// [`sum_precise`]
    Precise,
}

impl Summation {
    /// Every algorithm, from cheapest to most accurate.
    pub const ALL: [Summation; 6] = [
        Summation::Naive,
        Summation::Pairwise,
        Summation::Kahan,
        Summation::Kbn,
        Summation::Kb2,
        Summation::Precise,
    ];

    /// The lower-case name used by `Display` and `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Summation::Naive => "naive",
            Summation::Pairwise => "pairwise",
            Summation::Kahan => "kahan",
            Summation::Kbn => "kbn",
            Summation::Kb2 => "kb2",
            Summation::Precise => "precise",
        }
    }
}

impl fmt::Display for Summation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing a [`Summation`] name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseSummationError {
    /// The input was empty or only whitespace.
    Empty,
    /// The input does not name a known algorithm.
    UnknownAlgorithm(String),
}

impl fmt::Display for ParseSummationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseSummationError::Empty => write!(f, "empty summation algorithm name"),
            ParseSummationError::UnknownAlgorithm(name) => {
                write!(f, "unknown summation algorithm: {name:?}")
            }
        }
    }
}

impl std::error::Error for ParseSummationError {}

impl FromStr for Summation {
    type Err = ParseSummationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(ParseSummationError::Empty);
        }
        Summation::ALL
            .into_iter()
            .find(|algo| algo.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseSummationError::UnknownAlgorithm(name.to_string()))
    }
}

/// Sums a real slice with the chosen algorithm.
pub fn sum_with<F>(values: &[F], algorithm: Summation) -> F
where
    F: SumFloat + RealComponents,
{
    match algorithm {
        Summation::Naive => sum_naive(values),
        Summation::Pairwise => sum_pairwise(values),
        Summation::Kahan => sum_kahan(values),
        Summation::Kbn => sum_kbn(values),
        Summation::Kb2 => sum_kb2(values),
        Summation::Precise => sum_precise(values.iter().copied()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    fn cancellation_data() -> Vec<f64> {
        [1.0, 1e100, 1.0, -1e100].iter().map(|x| x * 10_000.0).collect()
    }

    // --- agreement on well-conditioned input ---

    #[test]
    fn test_all_methods_agree_on_small_integers() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sum_naive(&xs), 10.0);
        assert_eq!(sum_pairwise(&xs), 10.0);
        assert_eq!(sum_kahan(&xs), 10.0);
        assert_eq!(sum_kbn(&xs), 10.0);
        assert_eq!(sum_kb2(&xs), 10.0);
        assert_eq!(sum_precise(xs), 10.0);
        for algo in Summation::ALL {
            assert_eq!(sum_with(&xs, algo), 10.0, "{algo}");
        }
    }

    #[test]
    fn test_empty_input() {
        let xs: [f64; 0] = [];
        for algo in Summation::ALL {
            assert_eq!(sum_with(&xs, algo), 0.0, "{algo}");
        }
    }

    // --- cancellation ---

    #[test]
    fn test_kbn_kb2_beat_cancellation() {
        let xs = cancellation_data();
        assert_ne!(sum_naive(&xs), 20_000.0);
        assert_ne!(sum_pairwise(&xs), 20_000.0);
        assert_ne!(sum_kahan(&xs), 20_000.0);
        assert_eq!(sum_kbn(&xs), 20_000.0);
        assert_eq!(sum_kb2(&xs), 20_000.0);
        assert_eq!(sum_with(&xs, Summation::Precise), 20_000.0);
    }

    // --- complex ---

    #[test]
    fn test_complex_sums() {
        let zs = [
            Complex::new(1.0_f64, 2.0),
            Complex::new(2.0, 3.0),
            Complex::new(3.0, 4.0),
            Complex::new(4.0, 5.0),
        ];
        let expected = Complex::new(10.0, 14.0);
        assert_eq!(sum_naive(&zs), expected);
        assert_eq!(sum_pairwise(&zs), expected);
        assert_eq!(sum_kahan(&zs), expected);
        assert_eq!(sum_kbn(&zs), expected);
        assert_eq!(sum_kb2(&zs), expected);
    }

    #[test]
    fn test_complex_kbn_cancellation() {
        let zs: Vec<Complex<f64>> = cancellation_data()
            .into_iter()
            .map(|x| Complex::new(x, -x))
            .collect();
        assert_eq!(sum_kbn(&zs), Complex::new(20_000.0, -20_000.0));
        assert_eq!(sum_kb2(&zs), Complex::new(20_000.0, -20_000.0));
    }

    // --- start values and conversions ---

    #[test]
    fn test_start_value() {
        let xs = [1.0_f64, 2.0];
        assert_eq!(sum_naive_from(xs, 10.0), 13.0);
        assert_eq!(sum_kahan_from(xs, 10.0), 13.0);
        assert_eq!(sum_kbn_from(xs, 10.0), 13.0);
        assert_eq!(sum_kb2_from(xs, 10.0), 13.0);
    }

    #[test]
    fn test_start_value_generic_zero_f32() {
        let xs = [0.5_f32, 0.25];
        assert_eq!(sum_kahan(&xs), 0.75_f32);
        assert_eq!(sum_kahan_from(xs, 0.0_f32), 0.75_f32);
    }

    #[test]
    fn test_f32_accumulated_in_f64() {
        let xs = [16_777_216.0_f32, 1.0, 1.0];
        // In f32 each +1 is lost to rounding; in f64 it is exact.
        assert_eq!(sum_naive(&xs), 16_777_216.0_f32);
        assert_eq!(sum_naive_from(xs, 0.0_f64), 16_777_218.0);
        assert_eq!(sum_kbn_from(xs.iter().copied(), 0.0_f64), 16_777_218.0);
    }

    #[test]
    fn test_reals_into_complex() {
        let xs = [1.0_f64, 2.0, 3.0];
        assert_eq!(sum_kbn_from(xs, Complex::new(0.0, 1.0)), Complex::new(6.0, 1.0));
    }

    #[test]
    fn test_iterator_without_length() {
        let it = (1..=100).filter(|n| n % 2 == 0).map(|n| n as f64);
        assert_eq!(sum_kb2_from(it, 0.0), 2550.0);
    }

    #[test]
    fn test_pairwise_odd_split() {
        // len 3 splits as a + (b + c)
        let xs = [1e16, 1.0, 1.0];
        assert_eq!(sum_pairwise(&xs), 1e16 + (1.0 + 1.0));
    }

    #[test]
    fn test_non_finite_propagates() {
        let xs = [1.0, f64::NAN, 2.0];
        for algo in Summation::ALL {
            assert!(sum_with(&xs, algo).is_nan(), "{algo}");
        }
        let ys = [1.0, f64::INFINITY];
        assert_eq!(sum_with(&ys, Summation::Precise), f64::INFINITY);
        assert_eq!(sum_with(&ys, Summation::Naive), f64::INFINITY);
    }

    // --- Summation parsing ---

    #[test]
    fn test_summation_display_round_trip() {
        for algo in Summation::ALL {
            assert_eq!(algo.to_string().parse::<Summation>(), Ok(algo));
        }
    }

    #[test]
    fn test_summation_parse_case_and_whitespace() {
        assert_eq!(" KBN ".parse::<Summation>(), Ok(Summation::Kbn));
        assert_eq!("Precise".parse::<Summation>(), Ok(Summation::Precise));
        assert_eq!(Summation::default(), Summation::Pairwise);
    }

    #[test]
    fn test_summation_parse_errors() {
        assert_eq!("".parse::<Summation>(), Err(ParseSummationError::Empty));
        assert_eq!(
            "kbn3".parse::<Summation>(),
            Err(ParseSummationError::UnknownAlgorithm("kbn3".to_string()))
        );
        let err = "fast".parse::<Summation>().unwrap_err();
        assert_eq!(err.to_string(), "unknown summation algorithm: \"fast\"");
    }
}
