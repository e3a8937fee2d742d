//! Exact incremental summation with correct rounding.
//!
//! [`Summator`] keeps the running total as an *expansion*: a short list of
//! floating-point partials whose exact (unrounded) sum is the exact sum of
//! every finite input seen so far. Reading the total rounds that exact value
//! once, half to even.
//!
//! # Algorithm
//!
//! Adding a value runs Shewchuk's grow-expansion: the value is two-summed
//! with each partial in increasing order of magnitude, the rounding error of
//! each step replaces the partial, and the final rounded sum is appended.
//! Zero errors are dropped, so the partials stay nonzero, non-overlapping and
//! strictly increasing in magnitude. Their count is bounded by the exponent
//! range of the type (a few dozen), not by the number of inputs.
//!
//! A pairwise addition that overflows is *banked*: `2·M = 2^MAX_EXP` is
//! taken out of the larger operand and counted in the overflow degree, so
//! totals far outside the representable range remain exact. Non-finite
//! inputs bypass the partials and are added into a separate IEEE sum, which
//! poisons the result.
//!
//! References:
//! - Shewchuk (1997), "Adaptive Precision Floating-Point Arithmetic and Fast
//!   Robust Geometric Predicates", *Discrete & Computational Geometry* 18.
//! - Hettinger, Dickinson, "Full precision summation using multiple floats"
//!   (Python `math.fsum` and `lsum` recipes), for the half-even correction
//!   across partials and the overflow edge cases.
//!
//! # Examples
//! ```
//! use u_numsum::summator::Summator;
//! let mut s = Summator::new();
//! for x in [1e100, 1.0, -1e100, 1e-100, 1e50, -1.0, -1e50] {
//!     s.put(x);
//! }
//! assert_eq!(s.sum(), 1e-100);
//! ```

use std::iter::Sum;
use std::ops::{AddAssign, Neg, SubAssign};

use smallvec::SmallVec;

use crate::float::SumFloat;

/// Partials kept inline before spilling to the heap.
const INLINE_PARTIALS: usize = 32;

/// Correctly-rounded running sum over a [`SumFloat`] type.
///
/// Cloning deep-copies the partials; clones evolve independently.
#[derive(Debug, Clone)]
pub struct Summator<F: SumFloat> {
    partials: SmallVec<[F; INLINE_PARTIALS]>,
    non_finite: F,
    degree: isize,
}

/// Rounding error of `h = x + y` (Møller–Knuth two-sum, branch form).
#[inline]
fn two_sum_err<F: SumFloat>(x: F, y: F, h: F) -> F {
    if x.fabs() < y.fabs() {
        x - (h - y)
    } else {
        y - (h - x)
    }
}

#[inline]
fn two<F: SumFloat>() -> F {
    F::one() + F::one()
}

/// Folds partial `y` into the running value `s`, where `z` is the next
/// smaller partial (or zero). Returns the new value and whether the
/// remaining partials can no longer change the rounded result.
///
/// Requires `|y| < |s|`. When the fold is inexact and `z` has the sign of the
/// lost remainder, the true value lies strictly beyond the halfway point, so
/// a tie that rounded to even must be pushed the other way.
#[inline]
fn reduce_step<F: SumFloat>(s: F, y: F, z: F) -> (F, bool) {
    let x = s;
    let s = x + y;
    let d = s - x;
    let l = y - d;
    if l == F::zero() {
        return (s, false);
    }
    if z != F::zero() && !(l * z).signbit() {
        let l = l * two::<F>();
        let x = s + l;
        let t = x - s;
        if l == t {
            return (x, true);
        }
    }
    (s, true)
}

/// Sums `parts` (increasing magnitude) into `s`, which must dominate them.
fn partials_reduce<F: SumFloat>(mut s: F, parts: &[F]) -> F {
    for (i, &y) in parts.iter().enumerate().rev() {
        let z = if i > 0 { parts[i - 1] } else { F::zero() };
        let (next, done) = reduce_step(s, y, z);
        s = next;
        if done {
            break;
        }
    }
    s
}

impl<F: SumFloat> Summator<F> {
    /// Creates an empty accumulator (sum `0`).
    pub fn new() -> Self {
        Self {
            partials: SmallVec::new(),
            non_finite: F::zero(),
            degree: 0,
        }
    }

    /// Creates an accumulator seeded with `value`.
    pub fn with_value(value: F) -> Self {
        let mut s = Self::new();
        s.put(value);
        s
    }

    /// Replaces the state with a single `value`.
    pub fn set(&mut self, value: F) {
        self.reset();
        self.put(value);
    }

    /// Clears every partial, the non-finite sum and the overflow degree.
    pub fn reset(&mut self) {
        self.partials.clear();
        self.non_finite = F::zero();
        self.degree = 0;
    }

    /// Adds `x` exactly.
    ///
    /// Finite values extend the partials, banking any overflow of a pairwise
    /// addition into the overflow degree. NaN and ±∞ are added into the
    /// non-finite sum with ordinary IEEE addition.
    ///
    /// # Complexity
    /// O(p), where p is the number of partials.
    pub fn put(&mut self, x: F) {
        if x.is_finite() {
            self.grow(x, true);
        } else {
            self.non_finite += x;
        }
    }

    /// Adds a finite `x` without overflow banking.
    ///
    /// For callers that know no pairwise sum can overflow, e.g. `f32` data
    /// accumulated in a `Summator<f64>`. If that guarantee is broken the
    /// partials become non-finite and the result is meaningless; debug builds
    /// assert against it.
    pub fn put_unchecked(&mut self, x: F) {
        debug_assert!(x.is_finite(), "put_unchecked requires a finite value, got {x:?}");
        self.grow(x, false);
    }

    fn grow(&mut self, mut x: F, bank_overflow: bool) {
        let mut kept = 0;
        for j in 0..self.partials.len() {
            let mut y = self.partials[j];
            let mut h = x + y;
            if bank_overflow && h.is_infinite() {
                if x.fabs() < y.fabs() {
                    std::mem::swap(&mut x, &mut y);
                }
                let m = F::HALF_OVERFLOW;
                if h.signbit() {
                    x += m;
                    x += m;
                    self.degree -= 1;
                } else {
                    x -= m;
                    x -= m;
                    self.degree += 1;
                }
                tracing::trace!(degree = self.degree, "banked summation overflow");
                h = x + y;
            }
            debug_assert!(h.is_finite(), "pairwise sum overflowed: {x:?} + {y:?}");
            let l = two_sum_err(x, y, h);
            if l != F::zero() {
                self.partials[kept] = l;
                kept += 1;
            }
            x = h;
        }
        self.partials.truncate(kept);
        if x != F::zero() {
            self.partials.push(x);
        }
        debug_assert!(
            self.partials.iter().all(|p| p.is_finite() && *p != F::zero()),
            "partials must be finite and nonzero: {:?}",
            self.partials
        );
    }

    /// Returns the correctly-rounded total.
    ///
    /// If any non-finite value was added, returns the non-finite sum (NaN or
    /// ±∞). Otherwise rounds `partials + degree·2^MAX_EXP` half to even,
    /// returning ±∞ only when that exact value is outside the finite range.
    pub fn sum(&self) -> F {
        if self.non_finite != F::zero() {
            return self.non_finite;
        }
        self.finite_sum()
    }

    fn finite_sum(&self) -> F {
        let (mut y, mut parts) = match self.partials.split_last() {
            Some((&last, rest)) => (last, rest),
            None => (F::zero(), &[][..]),
        };
        if self.degree != 0 {
            let of = F::from_degree(self.degree);
            if y != F::zero() && (self.degree == -1 || self.degree == 1) && (of * y).signbit() {
                // One banked unit against an opposite-signed top partial:
                // work at half scale to decide whether the total is finite.
                y = y / two::<F>();
                let x = of * F::HALF_OVERFLOW;
                let h = x + y;
                let t = h - x;
                let l = (y - t) * two::<F>();
                y = h * two::<F>();
                if y.is_infinite() {
                    let x = h + l;
                    let t = x - h;
                    y = match parts.last() {
                        Some(&z) if t == l && !(l * z).signbit() => x * two::<F>(),
                        _ => F::infinity() * of,
                    };
                    parts = &[];
                } else if l != F::zero() {
                    let z = parts.last().copied().unwrap_or_else(F::zero);
                    let (s, done) = reduce_step(y, l, z);
                    y = s;
                    if done {
                        parts = &[];
                    }
                }
            } else {
                y = F::infinity() * of;
                parts = &[];
            }
        }
        partials_reduce(y, parts)
    }

    /// Returns the correctly-rounded sum of the partials alone, ignoring the
    /// non-finite sum and the overflow degree.
    pub fn partials_sum(&self) -> F {
        match self.partials.split_last() {
            Some((&last, rest)) => partials_reduce(last, rest),
            None => F::zero(),
        }
    }

    /// Returns the infinity the banked overflow amounts to, or `0` if the
    /// finite part of the total is representable.
    pub fn overflow(&self) -> F {
        if self.degree == 0 {
            return F::zero();
        }
        let total = self.finite_sum();
        if total.is_infinite() {
            total
        } else {
            F::zero()
        }
    }

    /// The IEEE sum of every non-finite input (`0` if there were none).
    #[inline]
    pub fn non_finite_sum(&self) -> F {
        self.non_finite
    }

    /// Banked overflow units: positive minus negative excursions past
    /// `2^MAX_EXP`.
    #[inline]
    pub fn overflow_degree(&self) -> isize {
        self.degree
    }

    /// The current partials, nonzero and increasing in magnitude.
    #[inline]
    pub fn partials(&self) -> &[F] {
        &self.partials
    }

    /// Whether the total is NaN.
    pub fn is_nan(&self) -> bool {
        self.non_finite.is_nan()
            || (self.non_finite != F::zero() && (self.non_finite + self.overflow()).is_nan())
    }

    /// Whether the total is finite.
    pub fn is_finite(&self) -> bool {
        self.non_finite == F::zero() && self.overflow() == F::zero()
    }

    /// Whether the total is ±∞.
    pub fn is_infinity(&self) -> bool {
        !self.non_finite.is_nan() && (self.non_finite + self.overflow()).is_infinite()
    }

    /// Converts to an accumulator over a type with at least the exponent
    /// range and precision of `F`.
    ///
    /// Partials are copied verbatim (they are exact in `E`). The overflow
    /// degree, counted in units of `2^F::MAX_EXP`, is split into a quotient in
    /// units of `2^E::MAX_EXP` and a remainder that is added as an ordinary
    /// value.
    ///
    /// # Examples
    /// ```
    /// use u_numsum::summator::Summator;
    /// let mut narrow = Summator::<f32>::new();
    /// for x in [f32::MAX, f32::MAX, -f32::MAX] {
    ///     narrow.put(x);
    /// }
    /// let wide: Summator<f64> = narrow.extend_to();
    /// assert_eq!(wide.sum(), f32::MAX as f64);
    /// ```
    pub fn extend_to<E>(&self) -> Summator<E>
    where
        E: SumFloat + From<F>,
    {
        debug_assert!(E::MAX_EXP >= F::MAX_EXP);
        let mut wide = Summator::<E> {
            partials: self.partials.iter().map(|&p| p.into()).collect(),
            non_finite: self.non_finite.into(),
            degree: 0,
        };
        if self.degree == 0 {
            return wide;
        }
        let shift = (E::MAX_EXP - F::MAX_EXP) as u32;
        let (high, low) = if shift == 0 {
            (self.degree, 0)
        } else if shift >= isize::BITS - 1 {
            (0, self.degree)
        } else {
            let base = 1_isize << shift;
            (self.degree / base, self.degree % base)
        };
        wide.degree = high;
        if low != 0 {
            let unit: E = Into::<E>::into(F::HALF_OVERFLOW) * two::<E>();
            wide.put(E::from_degree(low) * unit);
        }
        tracing::trace!(
            degree = self.degree,
            wide_degree = wide.degree,
            remainder = low,
            "rescaled overflow degree"
        );
        wide
    }
}

impl<F: SumFloat> Default for Summator<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SumFloat> From<F> for Summator<F> {
    fn from(value: F) -> Self {
        Self::with_value(value)
    }
}

impl<F: SumFloat> AddAssign<F> for Summator<F> {
    fn add_assign(&mut self, rhs: F) {
        self.put(rhs);
    }
}

impl<F: SumFloat> SubAssign<F> for Summator<F> {
    fn sub_assign(&mut self, rhs: F) {
        self.put(-rhs);
    }
}

impl<F: SumFloat> AddAssign<&Summator<F>> for Summator<F> {
    /// Merges `rhs` exactly. O(p·q) in the partial counts.
    fn add_assign(&mut self, rhs: &Summator<F>) {
        self.non_finite += rhs.non_finite;
        self.degree += rhs.degree;
        for &p in &rhs.partials {
            self.put(p);
        }
    }
}

impl<F: SumFloat> SubAssign<&Summator<F>> for Summator<F> {
    fn sub_assign(&mut self, rhs: &Summator<F>) {
        self.non_finite -= rhs.non_finite;
        self.degree -= rhs.degree;
        for &p in &rhs.partials {
            self.put(-p);
        }
    }
}

impl<F: SumFloat> AddAssign for Summator<F> {
    fn add_assign(&mut self, rhs: Summator<F>) {
        *self += &rhs;
    }
}

impl<F: SumFloat> SubAssign for Summator<F> {
    fn sub_assign(&mut self, rhs: Summator<F>) {
        *self -= &rhs;
    }
}

impl<F: SumFloat> Neg for Summator<F> {
    type Output = Summator<F>;

    fn neg(mut self) -> Summator<F> {
        for p in self.partials.iter_mut() {
            *p = -*p;
        }
        self.non_finite = -self.non_finite;
        self.degree = -self.degree;
        self
    }
}

impl<F: SumFloat> Extend<F> for Summator<F> {
    fn extend<I: IntoIterator<Item = F>>(&mut self, iter: I) {
        for x in iter {
            self.put(x);
        }
    }
}

impl<'a, F: SumFloat> Extend<&'a F> for Summator<F> {
    fn extend<I: IntoIterator<Item = &'a F>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<F: SumFloat> FromIterator<F> for Summator<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut s = Self::new();
        s.extend(iter);
        s
    }
}

impl<F: SumFloat> Sum<F> for Summator<F> {
    fn sum<I: Iterator<Item = F>>(iter: I) -> Self {
        iter.collect()
    }
}

impl<'a, F: SumFloat> Sum<&'a F> for Summator<F> {
    fn sum<I: Iterator<Item = &'a F>>(iter: I) -> Self {
        iter.copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------



#[cfg(test)]
mod proptests {
    use super::testing::*;
    use super::*;
    use proptest::prelude::*;

    /// Finite doubles of any sign and scale, including subnormals, whose
    /// sums cannot overflow.
    fn wide_vec(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(
            (prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO)
                .prop_filter("bounded", |x| x.abs() < 1e300),
            0..=max_len,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        // --- exact against an integer reference ---
        #[test]
        fn matches_exact_integer_total(
            data in proptest::collection::vec(-(1_i64 << 62)..(1_i64 << 62), 0..64)
        ) {
            let xs: Vec<f64> = data.iter().map(|&v| v as f64).collect();
            let exact: i128 = xs.iter().map(|&x| x as i128).sum();
            let s: Summator<f64> = xs.iter().sum();
            prop_assert_eq!(s.sum().to_bits(), (exact as f64).to_bits());
        }

        // --- order independence ---
        #[test]
        fn permutation_invariant(
            pair in wide_vec(64).prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let (data, shuffled) = pair;
            let a: Summator<f64> = data.iter().sum();
            let b: Summator<f64> = shuffled.iter().sum();
            prop_assert_eq!(a.sum().to_bits(), b.sum().to_bits());
        }

        // --- invariant on partials ---
        #[test]
        fn partials_form_expansion(data in wide_vec(64)) {
            let mut s = Summator::new();
            for &x in &data {
                s.put(x);
                prop_assert!(is_expansion(s.partials()), "{:?}", s.partials());
            }
        }

        // --- merge equals single pass ---
        #[test]
        fn merge_equals_sequential(a in wide_vec(32), b in wide_vec(32)) {
            let mut left: Summator<f64> = a.iter().sum();
            let right: Summator<f64> = b.iter().sum();
            left += &right;
            let single: Summator<f64> = a.iter().chain(b.iter()).sum();
            prop_assert_eq!(left.sum().to_bits(), single.sum().to_bits());
        }

        // --- self-cancellation ---
        #[test]
        fn subtracting_mirror_gives_zero(data in wide_vec(64)) {
            let mut s1: Summator<f64> = data.iter().sum();
            let s2 = s1.clone();
            s1 -= &s2;
            prop_assert_eq!(s1.sum(), 0.0);
        }

        // --- banked overflow round trip ---
        #[test]
        fn overflow_round_trip(data in wide_vec(16), k in 2_usize..8) {
            let m = <f64 as SumFloat>::HALF_OVERFLOW;
            let mut s: Summator<f64> = data.iter().sum();
            let before = s.sum();
            for _ in 0..2 * k {
                s.put(m);
            }
            prop_assert!(s.overflow_degree() != 0);
            prop_assert!(!s.is_finite());
            for _ in 0..2 * k {
                s.put(-m);
            }
            prop_assert!(s.is_finite());
            prop_assert_eq!(s.sum().to_bits(), before.to_bits());
        }

        // --- widening preserves exact small sums ---
        #[test]
        fn extend_matches_narrow(data in proptest::collection::vec(-100_000_i32..100_000, 0..64)) {
            let xs: Vec<f32> = data.iter().map(|&v| v as f32).collect();
            let narrow: Summator<f32> = xs.iter().sum();
            let wide: Summator<f64> = narrow.extend_to();
            prop_assert_eq!(wide.sum(), narrow.sum() as f64);
        }
    }
}
