// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors
//!
//! Everything the carver can refuse or fail at.  Cancellation lives
//! here too, but only internally: the public resize calls turn it
//! into `ResizeOutcome::Cancelled`.

use crate::pixels::ImageKind;
use thiserror::Error;

/// Result type alias for carver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid dimensions {width}x{height} with {channels} channels")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("buffer holds {actual} samples but {expected} were expected")]
    BufferLength { expected: usize, actual: usize },

    #[error("channel {channel} out of range for a {channels}-channel image")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("image kind {kind:?} needs {expected} channels, buffer has {actual}")]
    ChannelMismatch {
        kind: ImageKind,
        expected: usize,
        actual: usize,
    },

    #[error("target size {0} is below the minimum of 1")]
    TargetTooSmall(isize),

    #[error("an operation is in progress")]
    OperationInProgress,

    #[error("attached carver is {aux_width}x{aux_height}, root is {width}x{height}")]
    AttachedMismatch {
        width: usize,
        height: usize,
        aux_width: usize,
        aux_height: usize,
    },

    #[error("carver is attached to a root carver")]
    NotRoot,

    #[error("no attached carver with id {0}")]
    UnknownAttached(usize),

    #[error("enlargement step must be in (1, 2], got {0}")]
    InvalidEnlargementStep(f32),

    #[error("delta_x must be at least 1")]
    InvalidDeltaX,

    #[error("layer holds {actual} values but {expected} were expected")]
    LayerSize { expected: usize, actual: usize },

    #[error("visibility map rejected: {0}")]
    InvalidVisibilityMap(String),

    #[error("image is too narrow to enlarge")]
    TooNarrow,

    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    #[error("allocation failed")]
    OutOfMemory(#[from] std::collections::TryReserveError),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Allocate a vector of `len` copies of `value`, reporting exhaustion
/// instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, value);
    Ok(v)
}

/// Allocate an empty vector with room for `len` items.
pub(crate) fn try_with_capacity<T>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    Ok(v)
}
