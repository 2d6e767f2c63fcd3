// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-input combiner nodes.
//!
//! Both inputs must share dimensions; mismatches fail before any sample is
//! read.

use crate::artifact::Heightfield;

/// Elementwise combine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    /// `a + b`, renormalized
    Add,
    /// `a * b`, renormalized
    Multiply,
    /// Linear mix by the `Factor` pin
    Blend,
    /// `max(a, b)`
    Max,
    /// `min(a, b)`
    Min,
}

pub(crate) fn combine(op: CombineOp, a: &Heightfield, b: &Heightfield, factor: f32) -> Option<Heightfield> {
    let (mut output, renormalize) = match op {
        CombineOp::Add => (a.zip_with(b, |x, y| x + y)?, true),
        CombineOp::Multiply => (a.zip_with(b, |x, y| x * y)?, true),
        CombineOp::Blend => (a.zip_with(b, |x, y| x * (1.0 - factor) + y * factor)?, false),
        CombineOp::Max => (a.zip_with(b, f32::max)?, false),
        CombineOp::Min => (a.zip_with(b, f32::min)?, false),
    };
    if renormalize {
        output.normalize(0.0, 1.0);
    }
    Some(output)
}
