//! Orders slices along the through-plane axis and measures their spacing.

use crate::{
    error::CombineError,
    slice::SliceRecord,
    validation::{GridTolerances, extract_cosines},
    warnings::{GridWarning, WarningSink},
};

use nalgebra::Vector3;

/// Spatial order of a series, computed once and shared by the voxel
/// stacking and the affine construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceOrder {
    /// Input indices in ascending through-plane position
    pub indices: Vec<usize>,
    /// Sort keys in ascending order
    pub positions: Vec<f64>,
}

impl SliceOrder {
    /// Sort the slices by the projection of their position onto the normal of
    /// the first slice. Ties keep their input order.
    pub fn new(slices: &[SliceRecord]) -> Result<Self, CombineError> {
        let first = slices.first().ok_or(CombineError::EmptyInput)?;
        let (_, _, normal) = extract_cosines(&first.image_orientation);

        let keys: Vec<f64> = slices
            .iter()
            .map(|slice| Vector3::from(slice.image_position).dot(&normal))
            .collect();

        let mut indices: Vec<usize> = (0..slices.len()).collect();
        indices.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
        let positions = indices.iter().map(|&i| keys[i]).collect();

        Ok(Self { indices, positions })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Slices in sorted order
    pub fn sorted<'a>(&self, slices: &'a [SliceRecord]) -> Vec<&'a SliceRecord> {
        self.indices.iter().map(|&i| &slices[i]).collect()
    }

    /// Consecutive differences of the sorted positions
    pub fn spacings(&self) -> Vec<f64> {
        self.positions.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Mean slice spacing, `0.0` for a single slice
    pub fn mean_spacing(&self) -> f64 {
        mean(&self.spacings())
    }

    /// Fail when a spacing deviates from the mean enough to suggest a missing
    /// slice, warn when it deviates at all. Returns the mean spacing.
    pub fn check_spacing(
        &self,
        tolerances: &GridTolerances,
        sink: &dyn WarningSink,
    ) -> Result<f64, CombineError> {
        let spacings = self.spacings();
        let mean = mean(&spacings);
        let deviation = spacings
            .iter()
            .map(|&spacing| relative_deviation(spacing, mean))
            .fold(0.0, f64::max);

        // A NaN deviation must fail too
        if !(deviation <= tolerances.spacing_error) {
            return Err(CombineError::MissingSlices { spacings });
        } else if deviation > tolerances.spacing_warning {
            sink.warn(GridWarning::NonUniformSpacing { spacings, mean });
        }
        Ok(mean)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Non-finite positions yield an infinite deviation
fn relative_deviation(value: f64, mean: f64) -> f64 {
    let difference = (value - mean).abs();
    if difference.is_nan() {
        f64::INFINITY
    } else if difference == 0.0 {
        0.0
    } else if mean == 0.0 {
        f64::INFINITY
    } else {
        difference / mean.abs()
    }
}
