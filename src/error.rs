use crate::enums::{Attribute, CosineAxis, ElementType};

use thiserror::Error;

/// Reasons a list of slices cannot be stitched into a volume.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CombineError {
    #[error("Must provide at least one slice")]
    EmptyInput,

    #[error("All slices must have the same value for \"{attribute}\": {other} != {first}")]
    GeometryMismatch {
        attribute: Attribute,
        first: String,
        other: String,
    },

    #[error("Non-orthogonal direction cosines: {row:?}, {column:?} (dot product {dot:e})")]
    NonOrthogonalOrientation {
        row: [f64; 3],
        column: [f64; 3],
        dot: f64,
    },

    #[error("The {axis} direction cosine's magnitude is not 1: {cosine:?} ({magnitude})")]
    InvalidDirectionCosine {
        axis: CosineAxis,
        cosine: [f64; 3],
        magnitude: f64,
    },

    #[error("It appears there are missing slices. Slice spacings: {spacings:?}")]
    MissingSlices { spacings: Vec<f64> },

    #[error("Sorted slice {index} has pixel shape {actual:?}, expected {expected:?}")]
    PixelShapeMismatch {
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Pixel data of sorted slice {index} is {actual}, expected {expected}")]
    PixelTypeMismatch {
        index: usize,
        expected: ElementType,
        actual: ElementType,
    },
}
