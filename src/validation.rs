//! Checks that a list of slices describes one evenly spaced grid.

use crate::{
    enums::{Attribute, CosineAxis, ToleranceKind},
    error::CombineError,
    slice::SliceRecord,
    warnings::{GridWarning, WarningSink},
};

use nalgebra::Vector3;

/// Numeric thresholds used while validating a series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTolerances {
    /// Absolute tolerance for numeric invariant attributes
    pub attribute: f64,
    /// Orientation deviations above this fail
    pub orientation_error: f64,
    /// Orientation deviations above this are reported
    pub orientation_warning: f64,
    /// Relative spacing deviations above this fail
    pub spacing_error: f64,
    /// Relative spacing deviations above this are reported
    pub spacing_warning: f64,
}

impl Default for GridTolerances {
    fn default() -> Self {
        Self {
            attribute: 1e-3,
            orientation_error: 1e-4,
            orientation_warning: 1e-8,
            spacing_error: 1e-1,
            spacing_warning: 1e-5,
        }
    }
}

/// Row cosine, column cosine and slice normal of a 6-value orientation.
pub fn extract_cosines(orientation: &[f64; 6]) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let row = Vector3::new(orientation[0], orientation[1], orientation[2]);
    let column = Vector3::new(orientation[3], orientation[4], orientation[5]);
    let normal = row.cross(&column);
    (row, column, normal)
}

/// Compare every invariant attribute of the first slice against all others.
pub fn validate_attributes(
    slices: &[SliceRecord],
    tolerances: &GridTolerances,
) -> Result<(), CombineError> {
    let Some((first, rest)) = slices.split_first() else {
        return Err(CombineError::EmptyInput);
    };

    for attribute in Attribute::INVARIANTS {
        let tolerance = match attribute.tolerance() {
            ToleranceKind::Skipped => continue,
            ToleranceKind::Exact => 0.0,
            ToleranceKind::Numeric => tolerances.attribute,
        };
        let initial = first.attribute(attribute);
        for slice in rest {
            let value = slice.attribute(attribute);
            if !value.roughly_equal(&initial, tolerance) {
                return Err(CombineError::GeometryMismatch {
                    attribute,
                    first: initial.to_string(),
                    other: value.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Ensure the direction cosines are perpendicular and of unit length.
pub fn validate_orientation(
    orientation: &[f64; 6],
    tolerances: &GridTolerances,
    sink: &dyn WarningSink,
) -> Result<(), CombineError> {
    let (row, column, _) = extract_cosines(orientation);

    let dot = row.dot(&column);
    // Negated so that NaN fails
    if !(dot.abs() <= tolerances.orientation_error) {
        return Err(CombineError::NonOrthogonalOrientation {
            row: row.into(),
            column: column.into(),
            dot,
        });
    } else if dot.abs() > tolerances.orientation_warning {
        sink.warn(GridWarning::NearlyOrthogonal {
            row: row.into(),
            column: column.into(),
            dot,
        });
    }

    check_unit_length(CosineAxis::Row, &row, tolerances, sink)?;
    check_unit_length(CosineAxis::Column, &column, tolerances, sink)
}

fn check_unit_length(
    axis: CosineAxis,
    cosine: &Vector3<f64>,
    tolerances: &GridTolerances,
    sink: &dyn WarningSink,
) -> Result<(), CombineError> {
    let magnitude = cosine.norm();
    let deviation = (magnitude - 1.0).abs();
    if !(deviation <= tolerances.orientation_error) {
        return Err(CombineError::InvalidDirectionCosine {
            axis,
            cosine: (*cosine).into(),
            magnitude,
        });
    } else if deviation > tolerances.orientation_warning {
        sink.warn(GridWarning::CosineNotUnit {
            axis,
            cosine: (*cosine).into(),
            magnitude,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{slice::PixelData, warnings::WarningLog};
    use ndarray::Array2;

    fn slice() -> SliceRecord {
        SliceRecord::new(PixelData::U16(Array2::zeros((2, 3))))
            .with_modality("CT")
            .with_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
    }

    #[test]
    fn tiny_numeric_drift_is_accepted() {
        let mut other = slice();
        other.pixel_spacing = [1.0004, 0.9996];
        other.image_orientation[4] = 1.0009;
        assert_eq!(validate_attributes(&[slice(), other], &GridTolerances::default()), Ok(()));
    }

    #[test]
    fn first_mismatching_attribute_is_reported() {
        let other = slice().with_modality("MR").with_pixel_spacing(2.0, 2.0);
        match validate_attributes(&[slice(), other], &GridTolerances::default()) {
            Err(CombineError::GeometryMismatch {
                attribute,
                first,
                other,
            }) => {
                assert_eq!(attribute, Attribute::Modality);
                assert_eq!(first, "\"CT\"");
                assert_eq!(other, "\"MR\"");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn pixel_spacing_mismatch_is_detected() {
        let other = slice().with_pixel_spacing(1.0, 1.01);
        let err = validate_attributes(&[slice(), other], &GridTolerances::default()).unwrap_err();
        assert!(matches!(
            err,
            CombineError::GeometryMismatch {
                attribute: Attribute::PixelSpacing,
                ..
            }
        ));
    }

    #[test]
    fn missing_attribute_differs_from_present_one() {
        let mut other = slice();
        other.sop_class_uid = None;
        let err = validate_attributes(&[slice(), other], &GridTolerances::default()).unwrap_err();
        assert!(matches!(
            err,
            CombineError::GeometryMismatch {
                attribute: Attribute::SopClassUid,
                ..
            }
        ));
    }

    #[test]
    fn series_uid_is_not_compared() {
        let a = slice().with_series_instance_uid("1.2.3");
        let b = slice().with_series_instance_uid("4.5.6");
        assert_eq!(validate_attributes(&[a, b], &GridTolerances::default()), Ok(()));
    }

    #[test]
    fn orthonormal_orientation_passes_silently() {
        let log = WarningLog::new();
        let orientation = [0.0, 1.0, 0.0, 0.0, 0.0, -1.0];
        assert_eq!(validate_orientation(&orientation, &GridTolerances::default(), &log), Ok(()));
        assert!(log.is_empty());
    }

    #[test]
    fn skewed_cosines_fail() {
        let log = WarningLog::new();
        let orientation = [1.0, 0.0, 0.0, 0.001, 1.0, 0.0];
        let err = validate_orientation(&orientation, &GridTolerances::default(), &log).unwrap_err();
        assert!(matches!(err, CombineError::NonOrthogonalOrientation { .. }));
    }

    #[test]
    fn slightly_skewed_cosines_warn() {
        let log = WarningLog::new();
        let orientation = [1.0, 0.0, 0.0, 1e-6, 1.0, 0.0];
        assert_eq!(validate_orientation(&orientation, &GridTolerances::default(), &log), Ok(()));
        let warnings = log.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], GridWarning::NearlyOrthogonal { .. }));
    }

    #[test]
    fn short_column_cosine_fails() {
        let log = WarningLog::new();
        let orientation = [1.0, 0.0, 0.0, 0.0, 0.99, 0.0];
        let err = validate_orientation(&orientation, &GridTolerances::default(), &log).unwrap_err();
        assert!(matches!(
            err,
            CombineError::InvalidDirectionCosine {
                axis: CosineAxis::Column,
                ..
            }
        ));
    }

    #[test]
    fn nan_cosine_is_not_orthogonal() {
        let log = WarningLog::new();
        let orientation = [f64::NAN, 0.0, 0.0, 0.0, 1.0, 0.0];
        let err = validate_orientation(&orientation, &GridTolerances::default(), &log).unwrap_err();
        assert!(matches!(err, CombineError::NonOrthogonalOrientation { .. }));
        assert!(log.is_empty());
    }

    #[test]
    fn nan_cosine_length_is_invalid() {
        let log = WarningLog::new();
        let cosine = Vector3::new(0.0, f64::NAN, 0.0);
        let err = check_unit_length(CosineAxis::Column, &cosine, &GridTolerances::default(), &log)
            .unwrap_err();
        assert!(matches!(
            err,
            CombineError::InvalidDirectionCosine {
                axis: CosineAxis::Column,
                ..
            }
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn nearly_unit_row_cosine_warns() {
        let log = WarningLog::new();
        let orientation = [1.00001, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert_eq!(validate_orientation(&orientation, &GridTolerances::default(), &log), Ok(()));
        assert!(matches!(
            log.snapshot()[..],
            [GridWarning::CosineNotUnit {
                axis: CosineAxis::Row,
                ..
            }]
        ));
    }
}
