//! Non-fatal findings of the validation stages.
//!
//! The pipeline never logs on its own: every tolerable irregularity is
//! handed to a [`WarningSink`] supplied by the caller. [`TracingSink`]
//! forwards them to `tracing`, [`WarningLog`] keeps them for inspection.

use crate::enums::CosineAxis;

use std::fmt;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum GridWarning {
    /// The direction cosines are orthogonal within the hard tolerance only.
    NearlyOrthogonal {
        row: [f64; 3],
        column: [f64; 3],
        dot: f64,
    },
    /// A direction cosine is of unit length within the hard tolerance only.
    CosineNotUnit {
        axis: CosineAxis,
        cosine: [f64; 3],
        magnitude: f64,
    },
    /// Slice spacing varies, but not enough to suggest a missing slice.
    /// The mean spacing is used.
    NonUniformSpacing { spacings: Vec<f64>, mean: f64 },
}

impl fmt::Display for GridWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridWarning::NearlyOrthogonal { row, column, dot } => write!(
                f,
                "Direction cosines aren't quite orthogonal: {row:?}, {column:?} (dot {dot:e})"
            ),
            GridWarning::CosineNotUnit {
                axis,
                cosine,
                magnitude,
            } => write!(
                f,
                "The {axis} direction cosine's magnitude is not quite 1: {cosine:?} ({magnitude})"
            ),
            GridWarning::NonUniformSpacing { spacings, mean } => write!(
                f,
                "Non-uniform slice spacing, using mean spacing {mean}. Slice spacings: {spacings:?}"
            ),
        }
    }
}

/// Receiver for warnings raised while validating a series.
pub trait WarningSink {
    fn warn(&self, warning: GridWarning);
}

impl<F> WarningSink for F
where
    F: Fn(GridWarning),
{
    fn warn(&self, warning: GridWarning) {
        self(warning)
    }
}

/// Emits every warning as a `tracing` event at WARN level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, warning: GridWarning) {
        tracing::warn!(target: "dicom_stitch", "{warning}");
    }
}

/// Collects warnings in the order they were raised.
#[derive(Debug, Default)]
pub struct WarningLog {
    warnings: Mutex<Vec<GridWarning>>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_warnings(self) -> Vec<GridWarning> {
        self.warnings
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<GridWarning> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GridWarning>> {
        self.warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WarningSink for WarningLog {
    fn warn(&self, warning: GridWarning) {
        self.lock().push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn log_keeps_warnings_in_order() {
        let log = WarningLog::new();
        log.warn(GridWarning::NonUniformSpacing {
            spacings: vec![1.0, 1.00002],
            mean: 1.00001,
        });
        log.warn(GridWarning::CosineNotUnit {
            axis: CosineAxis::Row,
            cosine: [1.00001, 0.0, 0.0],
            magnitude: 1.00001,
        });
        assert_eq!(log.len(), 2);
        let warnings = log.into_warnings();
        assert!(matches!(warnings[0], GridWarning::NonUniformSpacing { .. }));
        assert!(matches!(warnings[1], GridWarning::CosineNotUnit { .. }));
    }

    #[test]
    fn closures_act_as_sinks() {
        let seen = RefCell::new(Vec::new());
        let sink = |warning: GridWarning| seen.borrow_mut().push(warning.to_string());
        sink.warn(GridWarning::NearlyOrthogonal {
            row: [1.0, 0.0, 0.0],
            column: [1e-6, 1.0, 0.0],
            dot: 1e-6,
        });
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].starts_with("Direction cosines aren't quite orthogonal"));
    }
}
