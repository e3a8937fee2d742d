//! Scalar abstractions shared by every summation algorithm.
//!
//! Two traits carry the whole crate:
//!
//! - [`SumFloat`]: an IEEE-754 binary floating-point type (`f32`, `f64`)
//!   with the exponent-range constants the exact [`Summator`] needs to bank
//!   overflow.
//! - [`RealComponents`]: a value made of one or more [`SumFloat`] parts.
//!   Real scalars have one component, complex numbers two. The compensated
//!   algorithms are written once against this trait and apply their error-free
//!   transformations componentwise.
//!
//! # Sign-bit primitives
//!
//! [`fabs_f64`], [`signbit_f64`] and their `f32` counterparts operate on the
//! raw bit pattern. They are `const fn`, so the same code is used during
//! constant evaluation and at runtime: `-0.0`, NaN payloads and infinities are
//! handled identically in both.
//!
//! [`Summator`]: crate::summator::Summator

use std::fmt::Debug;
use std::ops::{AddAssign, SubAssign};

use num_complex::Complex;
use num_traits::Float;

const SIGN_MASK_64: u64 = 1 << 63;
const SIGN_MASK_32: u32 = 1 << 31;

/// Absolute value of an `f64` by clearing the sign bit.
///
/// Unlike a comparison-based `if x < 0.0 { -x } else { x }`, this maps `-0.0`
/// to `+0.0` and strips the sign of NaN.
///
/// # Examples
/// ```
/// use u_numsum::float::fabs_f64;
/// const A: f64 = fabs_f64(-0.0);
/// assert!(A.is_sign_positive());
/// assert_eq!(fabs_f64(f64::NEG_INFINITY), f64::INFINITY);
/// ```
#[inline]
pub const fn fabs_f64(x: f64) -> f64 {
    f64::from_bits(x.to_bits() & !SIGN_MASK_64)
}

/// Absolute value of an `f32` by clearing the sign bit.
#[inline]
pub const fn fabs_f32(x: f32) -> f32 {
    f32::from_bits(x.to_bits() & !SIGN_MASK_32)
}

/// Returns `true` if the sign bit of `x` is set (including `-0.0` and
/// negative NaN).
#[inline]
pub const fn signbit_f64(x: f64) -> bool {
    x.to_bits() & SIGN_MASK_64 != 0
}

/// Returns `true` if the sign bit of `x` is set.
#[inline]
pub const fn signbit_f32(x: f32) -> bool {
    x.to_bits() & SIGN_MASK_32 != 0
}

/// An IEEE-754 binary floating-point type usable as a summation scalar.
pub trait SumFloat:
    Float + AddAssign + SubAssign + Debug + Default + Send + Sync + 'static
{
    /// One greater than the largest binary exponent: `2^MAX_EXP` is the
    /// first power of two that overflows (128 for `f32`, 1024 for `f64`).
    const MAX_EXP: i32;

    /// `M = 2^(MAX_EXP - 1)`, half of the banked overflow unit.
    ///
    /// The exact accumulator subtracts `M` twice whenever a pairwise addition
    /// overflows, so one unit of overflow degree stands for `2 * M`.
    const HALF_OVERFLOW: Self;

    /// Sign-insensitive absolute value (clears the sign bit).
    fn fabs(self) -> Self;

    /// Whether the sign bit is set.
    fn signbit(self) -> bool;

    /// Converts an overflow degree to this type (rounding if `|degree|`
    /// exceeds the mantissa).
    fn from_degree(degree: isize) -> Self;
}

macro_rules! impl_sum_float {
    ($t:ty, $fabs:ident, $signbit:ident, $half_overflow_bits:expr) => {
        impl SumFloat for $t {
            const MAX_EXP: i32 = <$t>::MAX_EXP;
            const HALF_OVERFLOW: Self = <$t>::from_bits($half_overflow_bits);

            #[inline]
            fn fabs(self) -> Self {
                $fabs(self)
            }

            #[inline]
            fn signbit(self) -> bool {
                $signbit(self)
            }

            #[inline]
            fn from_degree(degree: isize) -> Self {
                degree as $t
            }
        }
    };
}

// Biased exponent 254 -> 2^127, 2046 -> 2^1023.
impl_sum_float!(f32, fabs_f32, signbit_f32, 0x7F00_0000);
impl_sum_float!(f64, fabs_f64, signbit_f64, 0x7FE0_0000_0000_0000);

/// A value decomposable into one or more real [`SumFloat`] components.
///
/// Compensated summation of such values applies the scalar algorithm to each
/// component independently, which is exact for complex addition since it is
/// itself componentwise.
pub trait RealComponents: Copy + Debug {
    /// The real scalar each component is made of.
    type Real: SumFloat;

    /// Number of real components (1 for scalars, 2 for complex).
    const COMPONENTS: usize;

    /// The additive identity.
    fn zero() -> Self;

    /// Reads component `index` (`0..COMPONENTS`).
    fn component(&self, index: usize) -> Self::Real;

    /// Mutable access to component `index` (`0..COMPONENTS`).
    fn component_mut(&mut self, index: usize) -> &mut Self::Real;
}

macro_rules! impl_real_components_scalar {
    ($t:ty) => {
        impl RealComponents for $t {
            type Real = $t;
            const COMPONENTS: usize = 1;

            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn component(&self, index: usize) -> $t {
                debug_assert_eq!(index, 0);
                *self
            }

            #[inline]
            fn component_mut(&mut self, index: usize) -> &mut $t {
                debug_assert_eq!(index, 0);
                self
            }
        }
    };
}

impl_real_components_scalar!(f32);
impl_real_components_scalar!(f64);

impl<F: SumFloat> RealComponents for Complex<F> {
    type Real = F;
    const COMPONENTS: usize = 2;

    #[inline]
    fn zero() -> Self {
        Complex::new(F::zero(), F::zero())
    }

    #[inline]
    fn component(&self, index: usize) -> F {
        match index {
            0 => self.re,
            _ => self.im,
        }
    }

    #[inline]
    fn component_mut(&mut self, index: usize) -> &mut F {
        match index {
            0 => &mut self.re,
            _ => &mut self.im,
        }
    }
}
