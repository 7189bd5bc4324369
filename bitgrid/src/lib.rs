#![forbid(unsafe_code)]

//! # `bitgrid`: packed 1-bit-per-element storage
//!
//! Shadow masks store one bit per texel, and the serialized formats consumed
//! by shaders are flat `u32` arrays. This crate provides the two buffer shapes
//! everything else is built on:
//!
//!  * [`BitArray`]: a 1D bit buffer backed by `u32` words, with word-wise
//!    combinators, shifts/rotations over the logical length, and typed
//!    accessors for reading or writing 8/16/32/64-bit values at arbitrary
//!    *bit* offsets in either byte order.
//!  * [`BitGrid`]: a 2D view with row-major indexing, used for rasters and
//!    per-triangle occlusion masks.
//!
//! Bit `i` lives in word `i / 32` at position `i % 32`. Every mutating
//! operation leaves the unused high bits of the final word zeroed, so the
//! word slice can always be handed off for upload as-is.

/// The 1D bit buffer.
mod array;

/// 2D row-major wrapper.
mod grid;

/// Typed multi-bit reads and writes at arbitrary bit offsets.
mod span;

pub use self::array::BitArray;
pub use self::grid::BitGrid;
