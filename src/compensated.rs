//! Streaming summation accumulators.
//!
//! Each accumulator consumes values one at a time through `add` and reports
//! the running total through `total`, so the same algorithm serves both
//! slices and iterators of unknown length. All of them work on any
//! [`RealComponents`] value; complex numbers are compensated per component.
//!
//! | Accumulator | Error bound (relative, worst case) | State |
//! |---|---|---|
//! | [`Naive`] | O(n·ε) | `s` |
//! | [`Pairwise`] | O(log n·ε) | O(log n) partial sums |
//! | [`Kahan`] | O(ε) + O(n·ε²) | `s`, `c` |
//! | [`Kbn`] | O(ε) + O(n·ε²), robust to large addends | `s`, `c` |
//! | [`Kb2`] | O(ε) + O(n·ε³) | `s`, `cs`, `ccs` |
//!
//! References:
//! - Kahan (1965), "Further Remarks on Reducing Truncation Errors",
//!   *Communications of the ACM* 8(1).
//! - Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren zur Summation
//!   endlicher Summen", *ZAMM* 54(1), pp. 39–51.
//! - Klein (2006), "A Generalized Kahan-Babuška-Summation-Algorithm",
//!   *Computing* 76, pp. 279–293.

use smallvec::SmallVec;

use crate::float::{RealComponents, SumFloat};

/// Combines `a` and `b` component by component.
#[inline]
fn componentwise<T, Op>(mut a: T, b: T, op: Op) -> T
where
    T: RealComponents,
    Op: Fn(T::Real, T::Real) -> T::Real,
{
    for i in 0..T::COMPONENTS {
        let v = op(a.component(i), b.component(i));
        *a.component_mut(i) = v;
    }
    a
}

/// Adds `a + b` component by component.
#[inline]
pub(crate) fn add_components<T: RealComponents>(a: T, b: T) -> T {
    componentwise(a, b, |x, y| x + y)
}

/// One Neumaier step: `s += x`, accumulating the rounding error into `c`.
#[inline]
fn kbn_step<F: SumFloat>(s: &mut F, c: &mut F, x: F) {
    let t = *s + x;
    if s.fabs() >= x.fabs() {
        *c += (*s - t) + x;
    } else {
        *c += (x - t) + *s;
    }
    *s = t;
}

macro_rules! impl_accumulator_traits {
    ($name:ident) => {
        impl<T: RealComponents> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T: RealComponents> Extend<T> for $name<T> {
            fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
                for x in iter {
                    self.add(x);
                }
            }
        }

        impl<T: RealComponents> FromIterator<T> for $name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut acc = Self::new();
                acc.extend(iter);
                acc
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Naive
// ---------------------------------------------------------------------------

/// Plain left-to-right running sum with no error correction.
///
/// # Examples
/// ```
/// use u_numsum::compensated::Naive;
/// let acc: Naive<f64> = [1.0, 2.0, 3.0].into_iter().collect();
/// assert_eq!(acc.total(), 6.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Naive<T> {
    s: T,
}

impl<T: RealComponents> Naive<T> {
    /// Creates an accumulator starting at zero.
    pub fn new() -> Self {
        Self::with_value(T::zero())
    }

    /// Creates an accumulator starting at `start`.
    pub fn with_value(start: T) -> Self {
        Self { s: start }
    }

    /// Adds `x` to the running sum.
    #[inline]
    pub fn add(&mut self, x: T) {
        self.s = add_components(self.s, x);
    }

    /// Returns the running sum.
    #[inline]
    pub fn total(&self) -> T {
        self.s
    }

    /// Resets the running sum to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl_accumulator_traits!(Naive);

// ---------------------------------------------------------------------------
// Pairwise
// ---------------------------------------------------------------------------

/// Streaming pairwise (cascade) summation.
///
/// Keeps a stack of partial sums over blocks whose sizes are decreasing
/// powers of two. After the k-th value is pushed, the top of the stack is
/// merged `trailing_zeros(k)` times, like carrying in a binary counter. The
/// summation tree therefore has depth ⌈log₂ n⌉ without knowing `n` in
/// advance.
///
/// For power-of-two lengths the tree is identical to the recursive midpoint
/// split of [`sum_pairwise`](crate::summation::sum_pairwise).
///
/// # Complexity
/// Time: O(n), Space: O(log n)
#[derive(Debug, Clone)]
pub struct Pairwise<T: RealComponents> {
    stack: SmallVec<[T; 64]>,
    count: u64,
}

impl<T: RealComponents> Pairwise<T> {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self {
            stack: SmallVec::new(),
            count: 0,
        }
    }

    /// Creates an accumulator whose first value is `start`.
    pub fn with_value(start: T) -> Self {
        let mut acc = Self::new();
        acc.add(start);
        acc
    }

    /// Pushes `x` and merges completed blocks.
    pub fn add(&mut self, x: T) {
        self.count += 1;
        let mut carry = x;
        for _ in 0..self.count.trailing_zeros() {
            if let Some(left) = self.stack.pop() {
                carry = add_components(left, carry);
            }
        }
        self.stack.push(carry);
    }

    /// Sums the pending blocks from the smallest (most recent) upwards.
    pub fn total(&self) -> T {
        let mut blocks = self.stack.iter().rev();
        match blocks.next() {
            Some(&last) => blocks.fold(last, |acc, &left| add_components(left, acc)),
            None => T::zero(),
        }
    }

    /// Number of values added so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Drops every pending block.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.count = 0;
    }
}

impl_accumulator_traits!(Pairwise);

// ---------------------------------------------------------------------------
// Kahan
// ---------------------------------------------------------------------------

/// Classic Kahan compensated summation.
///
/// Maintains a compensation `c` holding the low-order bits lost by the last
/// addition, and subtracts it from the next addend:
/// `y = x − c; t = s + y; c = (t − s) − y; s = t`.
///
/// Kahan's correction fails when an addend is much larger than the running
/// sum; prefer [`Kbn`] for data with large intermediate cancellation.
#[derive(Debug, Clone, Copy)]
pub struct Kahan<T> {
    s: T,
    c: T,
}

impl<T: RealComponents> Kahan<T> {
    /// Creates an accumulator starting at zero.
    pub fn new() -> Self {
        Self::with_value(T::zero())
    }

    /// Creates an accumulator starting at `start`.
    pub fn with_value(start: T) -> Self {
        Self {
            s: start,
            c: T::zero(),
        }
    }

    /// Adds `x` using Kahan's update.
    #[inline]
    pub fn add(&mut self, x: T) {
        for i in 0..T::COMPONENTS {
            let s = self.s.component_mut(i);
            let c = self.c.component_mut(i);
            let y = x.component(i) - *c;
            let t = *s + y;
            *c = (t - *s) - y;
            *s = t;
        }
    }

    /// Returns the running sum `s`.
    #[inline]
    pub fn total(&self) -> T {
        self.s
    }

    /// Returns the current compensation term.
    #[inline]
    pub fn compensation(&self) -> T {
        self.c
    }

    /// Resets to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl_accumulator_traits!(Kahan);

// ---------------------------------------------------------------------------
// Kahan–Babuška–Neumaier
// ---------------------------------------------------------------------------

/// Kahan–Babuška–Neumaier compensated summation.
///
/// Unlike [`Kahan`], the error of each addition is recovered from whichever
/// operand has the larger magnitude, so a huge addend does not wipe out the
/// compensation. The correction is applied once, in [`Kbn::total`].
///
/// # Examples
/// ```
/// use u_numsum::compensated::Kbn;
/// let acc: Kbn<f64> = [1.0, 1e100, 1.0, -1e100].into_iter().collect();
/// assert_eq!(acc.total(), 2.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Kbn<T> {
    s: T,
    c: T,
}

impl<T: RealComponents> Kbn<T> {
    /// Creates an accumulator starting at zero.
    pub fn new() -> Self {
        Self::with_value(T::zero())
    }

    /// Creates an accumulator starting at `start`.
    pub fn with_value(start: T) -> Self {
        Self {
            s: start,
            c: T::zero(),
        }
    }

    /// Adds `x` using Neumaier's update.
    #[inline]
    pub fn add(&mut self, x: T) {
        for i in 0..T::COMPONENTS {
            kbn_step(
                self.s.component_mut(i),
                self.c.component_mut(i),
                x.component(i),
            );
        }
    }

    /// Returns `s + c`.
    #[inline]
    pub fn total(&self) -> T {
        add_components(self.s, self.c)
    }

    /// Resets to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl_accumulator_traits!(Kbn);

// ---------------------------------------------------------------------------
// Second-order Kahan–Babuška
// ---------------------------------------------------------------------------

/// Second-order generalized Kahan–Babuška summation (Klein 2006).
///
/// The first-order compensation `cs` is itself summed with Neumaier's step,
/// and its own rounding error is collected in `ccs`.
#[derive(Debug, Clone, Copy)]
pub struct Kb2<T> {
    s: T,
    cs: T,
    ccs: T,
}

impl<T: RealComponents> Kb2<T> {
    /// Creates an accumulator starting at zero.
    pub fn new() -> Self {
        Self::with_value(T::zero())
    }

    /// Creates an accumulator starting at `start`.
    pub fn with_value(start: T) -> Self {
        Self {
            s: start,
            cs: T::zero(),
            ccs: T::zero(),
        }
    }

    /// Adds `x`, propagating the error through both compensation levels.
    #[inline]
    pub fn add(&mut self, x: T) {
        for i in 0..T::COMPONENTS {
            let mut c = <T::Real as num_traits::Zero>::zero();
            kbn_step(self.s.component_mut(i), &mut c, x.component(i));
            kbn_step(self.cs.component_mut(i), self.ccs.component_mut(i), c);
        }
    }

    /// Returns `s + cs + ccs`, evaluated left to right.
    #[inline]
    pub fn total(&self) -> T {
        add_components(add_components(self.s, self.cs), self.ccs)
    }

    /// Resets to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl_accumulator_traits!(Kb2);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
