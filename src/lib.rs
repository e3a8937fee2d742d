//! # u-numsum
//!
//! Floating-point summation primitives for the U-Engine ecosystem.
//!
//! This crate provides summation algorithms ranging from a plain running sum
//! to a correctly-rounded exact accumulator. It is domain-agnostic: inputs
//! are plain `f32`/`f64` values or complex numbers built from them.
//!
//! ## Modules
//!
//! - [`summation`] — One-shot sums over slices and iterators
//!   (naive, pairwise, Kahan, KBN, KB2, precise) and runtime algorithm
//!   selection
//! - [`compensated`] — Streaming accumulators behind the one-shot sums
//! - [`summator`] — [`Summator`], the exact running sum with overflow banking
//! - [`float`] — Scalar traits and bit-level sign primitives
//!
//! ## Design Philosophy
//!
//! - **Exactness where it matters**: [`Summator`] rounds once, half to
//!   even, from an exact expansion; its result does not depend on input order
//! - **Total over IEEE-754**: NaN and ±∞ propagate, overflow of intermediate
//!   sums is banked instead of saturating; nothing panics
//! - **One algorithm, many shapes**: complex sums reuse the real algorithms
//!   per component through [`RealComponents`]
//! - **Property-based testing**: exactness and order independence verified
//!   via proptest

pub mod compensated;
pub mod float;
pub mod summation;
pub mod summator;

pub use float::{RealComponents, SumFloat};
pub use summation::{
    sum_kahan, sum_kb2, sum_kbn, sum_naive, sum_pairwise, sum_precise, sum_with, Summation,
};
pub use summator::Summator;
